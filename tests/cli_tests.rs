//! End-to-end CLI tests: pipe JSON programs into the `tacvm` binary and
//! check stdout/stderr/exit code, in the style of the teacher's
//! `tests/cli_tests.rs`.

use assert_cmd::Command;
use predicates::prelude::*;

fn tacvm() -> Command {
    Command::cargo_bin("tacvm").unwrap()
}

#[test]
fn help_displays_correctly() {
    tacvm().arg("--help").assert().success().stdout(predicate::str::contains("Usage")).stdout(predicate::str::contains("interp"));
}

#[test]
fn version_displays_correctly() {
    let version = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tacvm().arg("--version").assert().success().stdout(predicate::str::contains(version));
}

#[test]
fn missing_subcommand_fails() {
    tacvm().assert().failure();
}

#[test]
fn malformed_json_is_reported_on_stderr() {
    tacvm().arg("interp").write_stdin("not json").assert().failure().stderr(predicate::str::contains("JSON").or(predicate::str::contains("json")));
}

#[test]
fn missing_main_is_reported_on_stderr() {
    let program = r#"{"functions":[{"name":"helper","instrs":[{"op":"ret"}]}]}"#;
    tacvm().arg("interp").write_stdin(program).assert().failure().stderr(predicate::str::contains("main"));
}

/// Scenario 1: straight-line arithmetic.
#[test]
fn scenario_arithmetic_prints_sum() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"a","type":"int","value":3},
        {"op":"const","dest":"b","type":"int","value":4},
        {"op":"add","dest":"c","type":"int","args":["a","b"]},
        {"op":"print","args":["c"]},
        {"op":"ret"}
    ]}]}"#;
    tacvm().arg("interp").write_stdin(program).assert().success().stdout(predicate::str::diff("7\n"));
}

#[test]
fn scenario_arithmetic_reports_instruction_count() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"a","type":"int","value":3},
        {"op":"const","dest":"b","type":"int","value":4},
        {"op":"add","dest":"c","type":"int","args":["a","b"]},
        {"op":"print","args":["c"]},
        {"op":"ret"}
    ]}]}"#;
    tacvm()
        .arg("interp")
        .arg("--count")
        .write_stdin(program)
        .assert()
        .success()
        .stdout(predicate::str::contains("7"))
        .stdout(predicate::str::contains("Executed 4 instructions."));
}

/// Scenario 2: pointer arithmetic through the heap.
#[test]
fn scenario_pointer_arithmetic_round_trips_through_the_heap() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"one","type":"int","value":1},
        {"op":"const","dest":"offset","type":"int","value":1},
        {"op":"const","dest":"v","type":"int","value":42},
        {"op":"alloc","dest":"base","type":{"ptr":"int"},"args":["one"]},
        {"op":"ptradd","dest":"p","type":{"ptr":"int"},"args":["base","offset"]},
        {"op":"store","args":["p","v"]},
        {"op":"const","dest":"neg_offset","type":"int","value":-1},
        {"op":"ptradd","dest":"q","type":{"ptr":"int"},"args":["p","neg_offset"]},
        {"op":"load","dest":"r","type":"int","args":["q"]},
        {"op":"print","args":["r"]},
        {"op":"free","args":["q"]},
        {"op":"ret"}
    ]}]}"#;
    tacvm().arg("interp").write_stdin(program).assert().success().stdout(predicate::str::diff("42\n"));
}

/// Scenario 3: an unreachable labeled block is pruned silently; the reachable
/// straight-line path still runs.
#[test]
fn scenario_unreachable_block_is_pruned_without_error() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"a","type":"int","value":1},
        {"op":"print","args":["a"]},
        {"op":"ret"},
        {"label":"dead"},
        {"op":"const","dest":"b","type":"int","value":2},
        {"op":"print","args":["b"]},
        {"op":"ret"}
    ]}]}"#;
    tacvm().arg("interp").write_stdin(program).assert().success().stdout(predicate::str::diff("1\n"));
    tacvm().arg("cfg").write_stdin(program).assert().success().stdout(predicate::str::contains("dead").not());
}

/// Scenario 4: a dead store disappears under `opt -n dce` but the program's
/// observable output is unchanged.
#[test]
fn scenario_dce_drops_the_dead_store_but_preserves_output() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"x","type":"int","value":1},
        {"op":"const","dest":"x","type":"int","value":2},
        {"op":"print","args":["x"]},
        {"op":"ret"}
    ]}]}"#;
    let optimized = tacvm().arg("opt").arg("-n").arg("dce").write_stdin(program).assert().success().get_output().stdout.clone();
    let optimized = String::from_utf8(optimized).unwrap();
    assert!(optimized.matches("\"const\"").count() == 1, "expected exactly one surviving const, got: {optimized}");

    tacvm().arg("interp").write_stdin(optimized.as_str()).assert().success().stdout(predicate::str::diff("2\n"));
}

/// Scenario 5: an alloc/free pair with no other use is pure side-effecting
/// and must survive DCE.
#[test]
fn scenario_dce_keeps_alloc_free_pair() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"one","type":"int","value":1},
        {"op":"alloc","dest":"p","type":{"ptr":"int"},"args":["one"]},
        {"op":"free","args":["p"]},
        {"op":"ret"}
    ]}]}"#;
    let optimized = tacvm().arg("opt").arg("-n").arg("dce").write_stdin(program).assert().success().get_output().stdout.clone();
    let optimized = String::from_utf8(optimized).unwrap();
    assert!(optimized.contains("\"alloc\""));
    assert!(optimized.contains("\"free\""));

    tacvm().arg("interp").write_stdin(optimized.as_str()).assert().success();
}

/// Scenario 6: induction-variable strength reduction over `k = i * c` inside
/// a counting loop, verified by re-interpreting the optimized program.
#[test]
fn scenario_induction_variable_strength_reduction_preserves_output() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"i","type":"int","value":0},
        {"op":"const","dest":"n","type":"int","value":3},
        {"op":"const","dest":"c","type":"int","value":5},
        {"op":"const","dest":"one","type":"int","value":1},
        {"label":"loop"},
        {"op":"lt","dest":"cond","type":"bool","args":["i","n"]},
        {"op":"br","args":["cond"],"labels":["body","end"]},
        {"label":"body"},
        {"op":"mul","dest":"k","type":"int","args":["i","c"]},
        {"op":"print","args":["k"]},
        {"op":"add","dest":"i","type":"int","args":["i","one"]},
        {"op":"jmp","labels":["loop"]},
        {"label":"end"},
        {"op":"ret"}
    ]}]}"#;
    let optimized = tacvm().arg("opt").arg("-n").arg("licm").write_stdin(program).assert().success().get_output().stdout.clone();
    let optimized = String::from_utf8(optimized).unwrap();
    assert!(!optimized.contains("\"mul\""), "expected the multiply to be strength-reduced away, got: {optimized}");

    tacvm().arg("interp").write_stdin(optimized.as_str()).assert().success().stdout(predicate::str::diff("0\n5\n10\n"));
}

/// Scenario 6 variant with a non-unit basic-IV step (`i = add i two`
/// instead of `i = add i one`): the surrogate must advance by `a * step`
/// each iteration, not by `a` alone, or both the printed values and the
/// trip count come out wrong.
#[test]
fn scenario_induction_variable_strength_reduction_scales_by_nonunit_step() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"i","type":"int","value":0},
        {"op":"const","dest":"n","type":"int","value":6},
        {"op":"const","dest":"c","type":"int","value":5},
        {"op":"const","dest":"two","type":"int","value":2},
        {"label":"loop"},
        {"op":"lt","dest":"cond","type":"bool","args":["i","n"]},
        {"op":"br","args":["cond"],"labels":["body","end"]},
        {"label":"body"},
        {"op":"mul","dest":"k","type":"int","args":["i","c"]},
        {"op":"print","args":["k"]},
        {"op":"add","dest":"i","type":"int","args":["i","two"]},
        {"op":"jmp","labels":["loop"]},
        {"label":"end"},
        {"op":"ret"}
    ]}]}"#;

    let unoptimized_output = tacvm().arg("interp").write_stdin(program).assert().success().get_output().stdout.clone();

    let optimized = tacvm().arg("opt").arg("-n").arg("licm").write_stdin(program).assert().success().get_output().stdout.clone();
    let optimized = String::from_utf8(optimized).unwrap();
    assert!(!optimized.contains("\"mul\""), "expected the multiply to be strength-reduced away, got: {optimized}");

    let optimized_output = tacvm().arg("interp").write_stdin(optimized.as_str()).assert().success().get_output().stdout.clone();
    assert_eq!(optimized_output, unoptimized_output);
}

#[test]
fn nop_pass_round_trips_a_program_unchanged_in_behavior() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"a","type":"int","value":9},
        {"op":"print","args":["a"]},
        {"op":"ret"}
    ]}]}"#;
    let optimized = tacvm().arg("opt").arg("-n").arg("nop").write_stdin(program).assert().success().get_output().stdout.clone();
    let optimized = String::from_utf8(optimized).unwrap();
    tacvm().arg("interp").write_stdin(optimized.as_str()).assert().success().stdout(predicate::str::diff("9\n"));
}

#[test]
fn dom_dump_reports_block_and_loop_counts() {
    let program = r#"{"functions":[{"name":"main","instrs":[
        {"op":"const","dest":"i","type":"int","value":0},
        {"op":"const","dest":"n","type":"int","value":3},
        {"op":"const","dest":"one","type":"int","value":1},
        {"label":"loop"},
        {"op":"lt","dest":"cond","type":"bool","args":["i","n"]},
        {"op":"br","args":["cond"],"labels":["body","end"]},
        {"label":"body"},
        {"op":"add","dest":"i","type":"int","args":["i","one"]},
        {"op":"jmp","labels":["loop"]},
        {"label":"end"},
        {"op":"ret"}
    ]}]}"#;
    tacvm()
        .arg("dom")
        .write_stdin(program)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 natural loop(s)"));
}
