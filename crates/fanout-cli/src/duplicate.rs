use std::sync::Arc;

use eyre::{eyre, Result, WrapErr};
use fanout_core::{build_name, execute, fan_out_tasks, BucketStore, DispatchSummary};

use crate::settings::Settings;

/// Uploads the image as `0-<name>` and fans it out into `copies` objects.
///
/// Setup problems (missing file, missing bucket, failed upload) are errors.
/// Copies that exhaust their attempts are printed but do not fail the run.
pub async fn run_duplicate(settings: &Settings) -> Result<DispatchSummary> {
    let file_name = settings
        .image_file
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| eyre!("image file has no usable name: {}", settings.image_file.display()))?;
    if !settings.image_file.is_file() {
        return Err(eyre!(
            "error opening image file: {}",
            settings.image_file.display()
        ));
    }

    let store = BucketStore::new(&settings.store_root);
    if settings.create_bucket {
        store
            .create_bucket(&settings.bucket)
            .wrap_err_with(|| format!("failed to create bucket {}", settings.bucket))?;
    } else if !store.bucket_exists(&settings.bucket) {
        return Err(eyre!(
            "bucket {} does not exist under {} (pass --create-bucket to create it)",
            settings.bucket,
            settings.store_root.display()
        ));
    }

    let base_name = build_name(0, &file_name);
    let bytes = {
        let store = store.clone();
        let bucket = settings.bucket.clone();
        let image = settings.image_file.clone();
        let base = base_name.clone();
        tokio::task::spawn_blocking(move || store.insert_object(&bucket, &base, &image))
            .await?
            .wrap_err("unable to upload initial file to bucket")?
    };
    log::info!("uploaded {} ({bytes} bytes) to {}", base_name, settings.bucket);

    let tasks = fan_out_tasks(&settings.bucket, &file_name, settings.copies);
    println!(
        "fanout v{}: duplicating {} into {} object(s) in bucket {} ({} worker(s))",
        env!("CARGO_PKG_VERSION"),
        base_name,
        settings.copies,
        settings.bucket,
        settings.dispatch.workers
    );

    let summary = execute(tasks, &settings.dispatch, Arc::new(store)).await;
    for destination in &summary.failed {
        println!("Could not copy to {destination}");
    }
    print_summary(&summary);
    Ok(summary)
}

fn print_summary(summary: &DispatchSummary) {
    eprintln!(
        "Fanout complete: {} copied, {} failed, {} attempt(s) in {:.2?}",
        summary.succeeded(),
        summary.failed.len(),
        summary.attempts,
        summary.elapsed
    );
}
