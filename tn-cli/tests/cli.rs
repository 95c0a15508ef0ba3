use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const PROGRAM: &str = "interface Point { x: f64; y: f64; }\n\
                       let p: Point = { x: 1, y: 2.5 };\n";

fn write_program(dir: &Path, relative: &str, source: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, source).expect("write input");
}

fn write_runtime(dir: &Path) {
    let core = dir.join("src/core");
    fs::create_dir_all(&core).expect("create runtime");
    fs::write(core.join("core.hpp"), "#pragma once\n").expect("write header");
}

#[test]
fn emits_cpp_artifact() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "demo/points.tn", PROGRAM);

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "demo/points.tn", "--emit-only"])
        .assert()
        .success();

    let cpp = fs::read_to_string(dir.path().join("build/demo/points.cpp")).expect("read cpp");
    assert!(cpp.starts_with("#include \"src/core/core.hpp\""));
    assert!(cpp.contains("struct Point : virtual public Object {\nf64 x;\nf64 y;\n};"));
    assert!(cpp.contains("AutoRef<Point> p = AutoRef<Point>::make(); p->x = 1; p->y = 2.5f;"));
}

#[test]
fn compiles_with_external_compiler_and_copies_runtime() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "points.tn", PROGRAM);
    write_runtime(dir.path());

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "points.tn", "--compiler", "true"])
        .assert()
        .success();

    assert!(dir.path().join("build/points.cpp").exists());
    assert!(dir.path().join("build/src/core/core.hpp").exists());
    assert!(dir.path().join("dist").is_dir());
}

#[test]
fn reports_compiler_failure() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "points.tn", PROGRAM);
    write_runtime(dir.path());

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "points.tn", "--compiler", "false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("C++ compiler `false` failed"));
}

#[test]
fn reports_missing_runtime_tree() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "points.tn", PROGRAM);

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "points.tn", "--runtime", "nowhere", "--compiler", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing runtime support tree at nowhere"));
}

#[test]
fn reports_parse_errors_with_location() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "broken.tn", "let x: i32 = 1;\nlet y: i32 = 2\n");

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "broken.tn", "--emit-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error at 3:1"));
    assert!(!dir.path().join("build/broken.cpp").exists());
}

#[test]
fn rejects_object_literal_argument() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "call.tn", "draw({ x: 1 });\n");

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "call.tn", "--emit-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "object literal requires a declared context",
        ));
}

#[test]
fn rejects_input_path_without_file_name() {
    let dir = tempdir().expect("tempdir");

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["compile", "./", "--emit-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not name a file"));
}

#[test]
fn renders_canonical_source() {
    let dir = tempdir().expect("tempdir");
    write_program(dir.path(), "expr.tn", "let v: i32 = a + b * -c;\nprint('hi');");

    Command::cargo_bin("tn-cli")
        .expect("binary exists")
        .current_dir(dir.path())
        .args(["render", "expr.tn"])
        .assert()
        .success()
        .stdout("let v: i32 = (a + (b * (-c)));\nprint(\"hi\");\n");
}
