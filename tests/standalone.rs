//! Scenario tests for the sequential runner.

use std::fs;

use minimr::standalone::{engine, Job};
use minimr::{ihash, shuffle, workload};

#[test]
fn word_count_matches_expected_lines() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "foo bar foo").unwrap();
    fs::write(dir.path().join("b.txt"), "bar baz").unwrap();
    let out = dir.path().join("out");
    let job = Job {
        input: dir.path().join("*.txt").display().to_string(),
        workload: "wc".into(),
        output: out.display().to_string(),
        n_reduce: 2,
        args: vec![],
    };
    engine::run_job(&job, &workload::named("wc").unwrap()).unwrap();

    let mut lines = Vec::new();
    for reduce_id in 0..2 {
        let contents = fs::read_to_string(out.join(shuffle::output_name(reduce_id))).unwrap();
        for line in contents.lines() {
            let key = line.split(' ').next().unwrap();
            assert_eq!(ihash(key.as_bytes()) % 2, reduce_id);
            lines.push(line.to_string());
        }
    }
    lines.sort();
    assert_eq!(lines, vec!["bar 2", "baz 1", "foo 2"]);
}

#[test]
fn empty_input_still_produces_every_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.txt"), "").unwrap();
    let out = dir.path().join("out");
    let job = Job {
        input: dir.path().join("*.txt").display().to_string(),
        workload: "wc".into(),
        output: out.display().to_string(),
        n_reduce: 3,
        args: vec![],
    };
    engine::run_job(&job, &workload::named("wc").unwrap()).unwrap();

    for reduce_id in 0..3 {
        let contents = fs::read(out.join(shuffle::output_name(reduce_id))).unwrap();
        assert!(contents.is_empty());
    }
}

#[test]
fn grep_threads_aux_args_through() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hay.txt"), "hay\nneedle here\nhay").unwrap();
    let out = dir.path().join("out");
    let job = Job {
        input: dir.path().join("*.txt").display().to_string(),
        workload: "grep".into(),
        output: out.display().to_string(),
        n_reduce: 1,
        args: vec!["--term".into(), "needle".into()],
    };
    engine::run_job(&job, &workload::named("grep").unwrap()).unwrap();

    let contents = fs::read_to_string(out.join(shuffle::output_name(0))).unwrap();
    assert!(contents.contains("2:needle here"));
}
