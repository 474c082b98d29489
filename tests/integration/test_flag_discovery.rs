use flagprobe::error::ProbeError;
use flagprobe::harness::{Harness, HarnessConfig, Outcome};
use flagprobe::models::{ModelDescriptor, OpSpec};
use flagprobe::DetectorRegistry;
use serde_json::json;
use std::path::{Path, PathBuf};

fn interpreter() -> String {
    std::env::var("FLAGPROBE_PYTHON").unwrap_or_else(|_| "python3".to_string())
}

fn python_available() -> bool {
    std::process::Command::new(interpreter())
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

macro_rules! require_python {
    () => {
        if !python_available() {
            eprintln!("skipping: no Python interpreter available");
            return;
        }
    };
}

fn harness() -> Harness {
    Harness::new(HarnessConfig::new().with_interpreter(&interpreter()).with_timeout(20))
}

fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const TRAIN_SCRIPT: &str = r#"
import argparse

parser = argparse.ArgumentParser(description="Train a model")
parser.add_argument("--learning-rate", type=float, default=0.01, help="Learning rate")
parser.add_argument("--epochs", type=int, default=10)
parser.add_argument("--verbose", action="store_true")
parser.add_argument("--optimizer", choices=["sgd", "adam"], default="sgd")
parser.add_argument("-q")
args = parser.parse_args()

raise SystemExit("training should never start during discovery")
"#;

#[tokio::test]
async fn captures_declared_flags() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "train.py", TRAIN_SCRIPT);

    let outcome = harness().discover(&script).await;
    let manifest = match outcome {
        Outcome::Captured(manifest) => manifest,
        other => panic!("expected captured flags, got {:?}", other),
    };

    assert_eq!(
        manifest.names().collect::<Vec<_>>(),
        vec!["epochs", "learning-rate", "optimizer", "verbose"]
    );

    let lr = manifest.get("learning-rate").unwrap();
    assert_eq!(lr.default, Some(json!(0.01)));
    assert_eq!(lr.description.as_deref(), Some("Learning rate"));
    assert!(!lr.required);

    let verbose = manifest.get("verbose").unwrap();
    assert_eq!(verbose.switch_polarity, Some(true));
    assert!(verbose.default.is_none());

    assert_eq!(
        manifest.get("optimizer").unwrap().choices,
        Some(vec![json!("sgd"), json!("adam")])
    );
}

#[tokio::test]
async fn discovery_is_deterministic() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "train.py", TRAIN_SCRIPT);
    let harness = harness();

    let first = harness.discover(&script).await.into_manifest().unwrap();
    let second = harness.discover(&script).await.into_manifest().unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[tokio::test]
async fn second_registration_wins() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse\n\
         p = argparse.ArgumentParser(conflict_handler='resolve')\n\
         p.add_argument('--epochs', type=int, default=1)\n\
         p.add_argument('--epochs', type=int, default=5, help='Epochs')\n\
         p.parse_args()\n",
    );

    let manifest = harness().discover(&script).await.into_manifest().unwrap();
    let epochs = manifest.get("epochs").unwrap();
    assert_eq!(epochs.default, Some(json!(5)));
    assert_eq!(epochs.description.as_deref(), Some("Epochs"));
}

#[tokio::test]
async fn parse_known_args_also_finalizes() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "from argparse import ArgumentParser\n\
         def main():\n\
         \x20   p = ArgumentParser()\n\
         \x20   p.add_argument('--batch-size', type=int, default=32, required=True)\n\
         \x20   args, rest = p.parse_known_args()\n\
         if __name__ == '__main__':\n\
         \x20   main()\n",
    );

    let manifest = harness().discover(&script).await.into_manifest().unwrap();
    let batch = manifest.get("batch-size").unwrap();
    assert_eq!(batch.default, Some(json!(32)));
    assert!(batch.required);
}

#[tokio::test]
async fn script_without_argparse_is_unsupported() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "plain.py", "import sys\nprint(sys.argv)\n");
    let output = dir.path().join("flags.json");

    let outcome = harness().discover_to(&script, &output).await;

    assert!(matches!(outcome, Outcome::Unsupported));
    assert_eq!(outcome.exit_code(), 3);
    assert!(!output.exists());
}

#[tokio::test]
async fn captured_flags_written_to_output() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "train.py", TRAIN_SCRIPT);
    let output = dir.path().join("flags.json");

    let outcome = harness().discover_to(&script, &output).await;
    assert!(outcome.is_captured());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["verbose"], json!({"arg-switch": true}));
    assert_eq!(written["learning-rate"]["default"], json!(0.01));
}

#[tokio::test]
async fn error_before_registration_is_execution_failure() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse\nraise RuntimeError('dataset path is not configured')\n",
    );
    let output = dir.path().join("flags.json");

    let outcome = harness().discover_to(&script, &output).await;

    match outcome {
        Outcome::Failed(ProbeError::ExecutionFailure { message, .. }) => {
            assert!(message.contains("RuntimeError"));
            assert!(message.contains("dataset path is not configured"));
        }
        other => panic!("expected execution failure, got {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn exit_without_parse_never_finalizes() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse\n\
         p = argparse.ArgumentParser()\n\
         p.add_argument('--epochs', type=int)\n",
    );

    let outcome = harness().discover(&script).await;
    assert!(matches!(
        outcome,
        Outcome::Failed(ProbeError::ManifestNeverFinalized { .. })
    ));
}

#[tokio::test]
async fn looping_script_times_out() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "train.py", "import argparse\nwhile True:\n    pass\n");
    let harness = Harness::new(HarnessConfig::new().with_interpreter(&interpreter()).with_timeout(1));

    let outcome = harness.discover(&script).await;

    assert!(matches!(outcome, Outcome::TimedOut { timeout_seconds: 1 }));
    assert_eq!(outcome.exit_code(), 4);
}

#[tokio::test]
async fn discover_all_keeps_input_order() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let scripts = vec![
        write_script(dir.path(), "a.py", TRAIN_SCRIPT),
        write_script(dir.path(), "b.py", "print('no flags')\n"),
        write_script(
            dir.path(),
            "c.py",
            "import argparse\np = argparse.ArgumentParser()\np.add_argument('--seed', default=7)\np.parse_args()\n",
        ),
    ];
    let harness = Harness::new(
        HarnessConfig::new()
            .with_interpreter(&interpreter())
            .with_timeout(20)
            .with_max_concurrent(2),
    );

    let outcomes = harness.discover_all(&scripts).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].manifest().unwrap().get("learning-rate").is_some());
    assert!(matches!(outcomes[1], Outcome::Unsupported));
    assert_eq!(
        outcomes[2].manifest().unwrap().get("seed").unwrap().default,
        Some(json!(7))
    );
}

#[tokio::test]
async fn descriptor_loads_flags_lazily() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "train.py", TRAIN_SCRIPT);

    let mut descriptor: ModelDescriptor = DetectorRegistry::builtin()
        .resolve(&OpSpec::new("train.py"), dir.path())
        .unwrap();
    assert!(descriptor.flags.is_none());

    let harness = harness();
    let flags = descriptor.ensure_flags(&harness).await.unwrap();
    assert!(flags.get("epochs").is_some());

    let op_data = descriptor.op_data();
    assert_eq!(op_data.main, "train");
    assert_eq!(op_data.flags.len(), 4);
}

#[tokio::test]
async fn non_finite_defaults_are_kept() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse\n\
         p = argparse.ArgumentParser()\n\
         p.add_argument('--max-steps', type=float, default=float('inf'))\n\
         p.add_argument('--tolerance', type=float, default=float('nan'))\n\
         p.add_argument('--lr', default=0.1)\n\
         p.parse_args()\n",
    );

    let manifest = harness().discover(&script).await.into_manifest().unwrap();

    assert_eq!(
        manifest.names().collect::<Vec<_>>(),
        vec!["lr", "max-steps", "tolerance"]
    );
    assert_eq!(manifest.get("max-steps").unwrap().default, Some(json!("inf")));
    assert_eq!(manifest.get("tolerance").unwrap().default, Some(json!("nan")));
}

#[tokio::test]
async fn default_with_raising_eq_still_registers() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse\n\
         class Grid:\n\
         \x20   def __eq__(self, other):\n\
         \x20       raise ValueError('truth value of an array is ambiguous')\n\
         \x20   __hash__ = None\n\
         \x20   def __repr__(self):\n\
         \x20       return 'Grid()'\n\
         p = argparse.ArgumentParser()\n\
         p.add_argument('--grid', default=Grid())\n\
         p.add_argument('--epochs', type=int, default=3)\n\
         p.parse_args()\n",
    );

    let manifest = match harness().discover(&script).await {
        Outcome::Captured(manifest) => manifest,
        other => panic!("expected captured flags, got {:?}", other),
    };
    assert_eq!(manifest.get("grid").unwrap().default, Some(json!("Grid()")));
    assert_eq!(manifest.get("epochs").unwrap().default, Some(json!(3)));
}

#[tokio::test]
async fn background_process_does_not_delay_capture() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "train.py",
        "import argparse, subprocess, sys\n\
         subprocess.Popen([sys.executable, '-c', 'import time; time.sleep(30)'])\n\
         p = argparse.ArgumentParser()\n\
         p.add_argument('--lr', default=0.1)\n\
         p.parse_args()\n",
    );
    let harness = Harness::new(HarnessConfig::new().with_interpreter(&interpreter()).with_timeout(10));

    let started = std::time::Instant::now();
    let outcome = harness.discover(&script).await;

    assert!(outcome.is_captured(), "expected captured flags, got {:?}", outcome);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_tears_down_background_processes() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("worker.pid");
    let script = write_script(
        dir.path(),
        "train.py",
        &format!(
            "import argparse, subprocess, sys\n\
             worker = subprocess.Popen([sys.executable, '-c', 'import time; time.sleep(60)'])\n\
             open({:?}, 'w').write(str(worker.pid))\n\
             while True:\n\
             \x20   pass\n",
            pid_file.display().to_string()
        ),
    );
    let harness = Harness::new(HarnessConfig::new().with_interpreter(&interpreter()).with_timeout(2));

    let outcome = harness.discover(&script).await;
    assert!(matches!(outcome, Outcome::TimedOut { timeout_seconds: 2 }));

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let proc_entry = PathBuf::from(format!("/proc/{}", pid.trim()));
    let mut alive = true;
    for _ in 0..20 {
        let state = std::fs::read_to_string(proc_entry.join("stat")).unwrap_or_default();
        // Gone, or a zombie waiting to be reaped
        if state.is_empty() || state.contains(") Z") {
            alive = false;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert!(!alive, "background worker {} survived the timeout", pid.trim());
}

#[tokio::test]
async fn nested_keras_script_backfills_op_data() {
    require_python!();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    write_script(
        dir.path(),
        "models/mnist.py",
        "import argparse\n\
         from keras.models import Sequential\n\
         p = argparse.ArgumentParser()\n\
         p.add_argument('--epochs', type=int, default=5)\n\
         p.add_argument('--batch-size', type=int, default=32)\n\
         args = p.parse_args()\n\
         model = Sequential()\n\
         model.fit(x, y, epochs=args.epochs)\n",
    );

    let registry = DetectorRegistry::builtin();
    let mut descriptor = registry
        .resolve(&OpSpec::new("models/mnist.py"), dir.path())
        .unwrap();
    assert_eq!(descriptor.detector, "keras");

    descriptor.ensure_flags(&harness()).await.unwrap();
    let mut op_data = descriptor.op_data();
    assert_eq!(op_data.main, "models.mnist");

    registry.backfill_op_data(&descriptor.detector, &mut op_data, dir.path());

    let compare = op_data.compare.unwrap();
    assert_eq!(&compare[..2], &["=batch-size".to_string(), "=epochs".to_string()]);
    assert!(op_data.output_scalars.is_some());
}
