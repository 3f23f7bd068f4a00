use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::tempdir;

use wait_timeout::ChildExt;

pub struct TestContext {
    pub _work: tempfile::TempDir,
    pub workspace: PathBuf,
    pub store_root: PathBuf,
    pub config_dir: PathBuf,
    pub image_file: PathBuf,
    pub cli_bin: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let work = tempdir().expect("tempdir");
        let workspace = work.path().to_path_buf();

        let store_root = workspace.join("store");
        fs::create_dir_all(store_root.join("media")).expect("bucket dir");

        // empty config dir keeps the user's own fanout.toml out of the tests
        let config_dir = workspace.join("cli-config");
        fs::create_dir_all(&config_dir).expect("cli config");

        let image_file = workspace.join("logo.png");
        fs::write(&image_file, b"not really a png").expect("image file");

        Self {
            _work: work,
            workspace,
            store_root,
            config_dir,
            image_file,
            cli_bin: PathBuf::from(env!("CARGO_BIN_EXE_fanout")),
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.cli_bin);
        cmd.arg("--config-dir")
            .arg(&self.config_dir)
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn objects(&self, bucket: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.store_root.join(bucket))
            .expect("read bucket")
            .map(|entry| {
                entry
                    .expect("bucket entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> std::process::Output {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().expect("spawn command");

    match child.wait_timeout(timeout).expect("wait for process") {
        Some(_status) => child
            .wait_with_output()
            .expect("collect command output after completion"),
        None => {
            let _ = child.kill();
            let output = child
                .wait_with_output()
                .expect("collect output after killing command");
            panic!(
                "command timed out after {:?}\nstdout:\n{}\nstderr:\n{}",
                timeout,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
    }
}
