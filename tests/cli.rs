//! Tests that run the compiled `hello-service` binary.
//!
//! These cover what only the real process shows: environment lookup, the
//! startup log line, exit codes and signal handling.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

const BIN: &str = env!("CARGO_BIN_EXE_hello-service");

/// How long the process may take to start listening
const STARTUP_WINDOW: Duration = Duration::from_secs(5);

const DESCRIPTOR: &str = r#"
replicas = 3
image = "hello-service:latest"
containerPort = 3000

[service]
exposedPort = 80
routing = "NodeExposed"
nodePort = 30080
"#;

/// Base command with the environment the tests control cleared.
fn hello_service() -> Command {
    let mut command = Command::new(BIN);
    command
        .env_remove("PORT")
        .env_remove("HOST")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null());
    command
}

fn run(command: &mut Command) -> Output {
    command.output().expect("Failed to run hello-service")
}

/// Ask the OS for a port that is free right now.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_descriptor(dir: &Path) -> PathBuf {
    let path = dir.join("descriptor.toml");
    std::fs::write(&path, DESCRIPTOR).unwrap();
    path
}

/// Kills the server process if a test fails before stopping it.
struct ServerProcess {
    child: Option<Child>,
}

impl ServerProcess {
    fn spawn(port: u16) -> Self {
        let child = hello_service()
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start hello-service");
        Self { child: Some(child) }
    }

    /// Poll until the port accepts connections
    fn wait_for_ready(&self, port: u16) {
        let deadline = Instant::now() + STARTUP_WINDOW;
        while TcpStream::connect(("127.0.0.1", port)).is_err() {
            assert!(
                Instant::now() < deadline,
                "hello-service not listening on {} within {:?}",
                port,
                STARTUP_WINDOW
            );
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[cfg(unix)]
    fn terminate(&self) {
        let pid = self.child.as_ref().unwrap().id();
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .expect("Failed to run kill");
        assert!(status.success());
    }

    /// Wait for exit and collect stdout
    fn wait(mut self, timeout: Duration) -> (ExitStatus, String) {
        let mut child = self.child.take().unwrap();
        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait().unwrap() {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                panic!("hello-service did not exit within {:?}", timeout);
            }
            std::thread::sleep(Duration::from_millis(50));
        };
        let mut stdout = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_string(&mut stdout).unwrap();
        }
        (status, stdout)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(unix)]
#[tokio::test]
async fn serves_on_env_port_and_exits_zero_on_sigterm() {
    let port = free_port();
    let server = ServerProcess::spawn(port);
    server.wait_for_ready(port);

    let response = reqwest::get(format!("http://127.0.0.1:{}/", port))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Hello World");

    server.terminate();
    let (status, stdout) = server.wait(Duration::from_secs(10));

    assert_eq!(status.code(), Some(0), "stdout: {}", stdout);
    assert!(
        stdout.contains(&format!("Listening on http://127.0.0.1:{}", port)),
        "no startup line in: {}",
        stdout
    );
}

#[test]
fn occupied_port_exits_1() {
    let occupant = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupant.local_addr().unwrap().port();

    let output = run(hello_service()
        .env("PORT", port.to_string())
        .env("HOST", "127.0.0.1"));

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn malformed_port_exits_2() {
    let output = run(hello_service().env("PORT", "abc"));

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PORT"), "stderr: {}", stderr);
}

#[test]
fn descriptor_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(dir.path());

    let output = run(hello_service()
        .args(["descriptor", "check"])
        .arg(&path)
        .args(["--port", "3000"]));

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok"), "stdout: {}", stdout);
    assert!(stdout.contains("replicas=3"), "stdout: {}", stdout);
}

#[test]
fn descriptor_check_rejects_port_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(dir.path());

    let output = run(hello_service()
        .args(["descriptor", "check"])
        .arg(&path)
        .args(["--port", "8080"]));

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn descriptor_check_rejects_zero_replicas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("descriptor.toml");
    std::fs::write(&path, DESCRIPTOR.replace("replicas = 3", "replicas = 0")).unwrap();

    let output = run(hello_service().args(["descriptor", "check"]).arg(&path));

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn descriptor_commands_ignore_server_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(dir.path());

    let output = run(hello_service()
        .env("PORT", "abc")
        .args(["descriptor", "check"])
        .arg(&path));

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn descriptor_render_prints_kubernetes_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(dir.path());

    let output = run(hello_service().args(["descriptor", "render"]).arg(&path));

    assert_eq!(output.status.code(), Some(0));
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout)
        .expect("render output is not JSON");
    assert_eq!(manifest["kind"], "List");
    assert_eq!(manifest["items"][0]["kind"], "Deployment");
    assert_eq!(manifest["items"][0]["spec"]["replicas"], 3);
    assert_eq!(manifest["items"][1]["spec"]["type"], "NodePort");
    assert_eq!(manifest["items"][1]["spec"]["ports"][0]["nodePort"], 30080);
}
