use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.assert().success().stdout(contains("nybble"));
}

#[test]
fn runs_add() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run").arg("tests/files/add.asm").arg("--steps").arg("4");

    cmd.assert()
        .success()
        .stdout(contains("o0 = 0x08 (8)"))
        .stdout(contains("c = 0x08"))
        .stdout(contains("pc = 0x08"));
}

#[test]
fn runs_path_shortcut() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("tests/files/add.asm");
    cmd.assert().success().stdout(contains("o0 = 0x08 (8)"));
}

#[test]
fn runs_with_input() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run")
        .arg("tests/files/countdown.asm")
        .arg("--input")
        .arg("i0=3");
    cmd.assert().success().stdout(contains("o1 = 0x03 (3)"));

    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run")
        .arg("tests/files/countdown.asm")
        .arg("-i")
        .arg("i0=0x10");
    cmd.assert().success().stdout(contains("o1 = 0x10 (16)"));
}

#[test]
fn rejects_bad_input() {
    for input in ["o0=1", "i9=1", "i0=300", "i0"] {
        let mut cmd = Command::cargo_bin("nybble").unwrap();
        cmd.arg("run")
            .arg("tests/files/add.asm")
            .arg("--input")
            .arg(input);
        cmd.assert().failure();
    }
}

#[test]
fn seeded_runs_repeat() {
    let run = |seed: Option<&str>, env_seed: Option<&str>| {
        let mut cmd = Command::cargo_bin("nybble").unwrap();
        cmd.arg("run").arg("tests/files/random.asm");
        if let Some(seed) = seed {
            cmd.arg("--seed").arg(seed);
        }
        match env_seed {
            Some(seed) => cmd.env("NYBBLE_SEED", seed),
            None => cmd.env_remove("NYBBLE_SEED"),
        };
        let output = cmd.output().unwrap();
        assert!(output.status.success());
        output.stdout
    };

    let first = run(Some("7"), None);
    assert_eq!(first, run(Some("7"), None));
    assert_eq!(first, run(None, Some("7")));
    // Flag wins over the environment
    assert_eq!(first, run(Some("7"), Some("8")));

    let drawn = String::from_utf8(run(Some("42"), None)).unwrap();
    assert!(drawn.contains("o0 = 0xa2 (162)"));
    assert!(drawn.contains("o1 = 0x63 (99)"));
}

#[test]
fn checks_file() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("check").arg("tests/files/countdown.asm");
    cmd.assert().success().stdout(contains("no errors found!"));
}

#[test]
fn reports_missing_operand() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("check").arg("tests/files/missing_operand.asm");
    cmd.assert()
        .failure()
        .stderr(contains("missing_operand"))
        .stderr(contains("Expected a register operand"));
}

#[test]
fn reports_unresolved_label() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run").arg("tests/files/unresolved.asm");
    cmd.assert()
        .failure()
        .stderr(contains("unresolved_label"));
}

#[test]
fn compiles_then_runs_binary() {
    let dest = std::env::temp_dir().join(format!("nybble-add-{}.bin", std::process::id()));

    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("compile").arg("tests/files/add.asm").arg(&dest);
    cmd.assert().success().stdout(contains("emit 8 bytes"));
    assert_eq!(
        std::fs::read(&dest).unwrap(),
        vec![0xC0, 0x05, 0xC1, 0x03, 0x12, 0x01, 0xE2, 0x80]
    );

    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run").arg(&dest).arg("--steps").arg("4");
    cmd.assert().success().stdout(contains("o0 = 0x08 (8)"));

    std::fs::remove_file(&dest).unwrap();
}

#[test]
fn rejects_unknown_extension() {
    let mut cmd = Command::cargo_bin("nybble").unwrap();
    cmd.arg("run").arg("tests/files/add.txt");
    cmd.assert().failure().stderr(contains("unknown extension"));
}
