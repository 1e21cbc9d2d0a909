//! Benchmarks for report rendering.

use comicflow::pipeline::PipelineRun;
use comicflow::report::{render, render_json};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn stage(name: &str, outcome: &str, stderr: &str) -> serde_json::Value {
    json!({
        "stage": name,
        "outcome": outcome,
        "command": format!("python3 {name}.py /in/issue.cbz *** 75"),
        "captured_stdout": "processing page 1\nprocessing page 2\n".repeat(50),
        "captured_stderr": stderr,
        "duration_seconds": 12.5,
    })
}

fn failed_run() -> PipelineRun {
    let mut editor = stage("script_editor", "failure", &"Traceback line\n".repeat(200));
    editor["failure_reason"] = json!({"kind": "non_zero_exit", "code": 1});
    editor["exit_code"] = json!(1);

    serde_json::from_value(json!({
        "run_id": "pipeline_20240309T070501_1a2b3c4d",
        "source_path": "/in/issue.cbz",
        "competitor_data_path": "/in/competitors.csv",
        "target_duration": 75,
        "status": "failed",
        "phase": {"phase": "failed"},
        "started_at": "2024-03-09T07:05:01Z",
        "finished_at": "2024-03-09T07:06:13Z",
        "stage_results": [stage("comic_processor", "success", ""), editor],
        "failure": {
            "stage": "script_editor",
            "reason": {"kind": "stage_execution", "failure": {"kind": "non_zero_exit", "code": 1}}
        }
    }))
    .expect("fixture matches the run schema")
}

fn report_benchmark(c: &mut Criterion) {
    let run = failed_run();

    c.bench_function("render_text", |b| b.iter(|| render(black_box(&run))));
    c.bench_function("render_json", |b| b.iter(|| render_json(black_box(&run))));
}

criterion_group!(benches, report_benchmark);
criterion_main!(benches);
