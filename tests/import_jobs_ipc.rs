mod test_support;

use serde_json::json;
use test_support::{
    count_rows, open_workspace_db, request_err, request_ok, select_workspace, spawn_sidecar,
    temp_dir, wait_for_job,
};

#[test]
fn background_imports_finish_and_keep_the_average_consistent() {
    let workspace = temp_dir("ratingd-jobs");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let mut job_ids = Vec::new();
    for (i, subject) in ["Math", "Physics", "Math", "History"].iter().enumerate() {
        let text = format!(
            "Группа: CS-101\nДисциплина: {}\n1 Ivanov {}\n2 Petrov 90\n",
            subject,
            70 + i
        );
        let started = request_ok(
            &mut stdin,
            &mut reader,
            &format!("start-{}", i),
            "ratings.importStart",
            json!({ "text": text }),
        );
        job_ids.push(started["jobId"].as_str().expect("jobId").to_string());
    }

    for job_id in &job_ids {
        let status = wait_for_job(&mut stdin, &mut reader, job_id);
        assert_eq!(status["state"], "done", "{}", status);
        assert_eq!(status["report"]["rowsImported"], 2);
        assert_eq!(status["report"]["rowsFailed"], json!([]));
    }

    // A job is forgotten once its final status has been read.
    let again = request_err(
        &mut stdin,
        &mut reader,
        "again",
        "ratings.importStatus",
        json!({ "jobId": job_ids[0] }),
    );
    assert_eq!(again["code"], "not_found");
    let health = request_ok(&mut stdin, &mut reader, "health", "health", json!({}));
    assert_eq!(health["runningImports"], 0);

    let conn = open_workspace_db(&workspace);
    assert_eq!(count_rows(&conn, "subjects"), 3);
    assert_eq!(count_rows(&conn, "ratings"), 6);
    let mut stmt = conn
        .prepare(
            "SELECT sm.avg_score, (SELECT AVG(r.score) FROM ratings r WHERE r.subject_id = sm.subject_id)
             FROM summaries sm",
        )
        .expect("prepare");
    let pairs: Vec<(f64, f64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(pairs.len(), 3);
    for (stored, mean) in pairs {
        assert!((stored - mean).abs() < 1e-9);
    }
}

#[test]
fn failed_background_import_reports_error_code() {
    let workspace = temp_dir("ratingd-jobs-failed");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "ratings.importStart",
        json!({ "text": "Дисциплина: Math\n1 Ivanov 85\n" }),
    );
    let job_id = started["jobId"].as_str().expect("jobId").to_string();
    let status = wait_for_job(&mut stdin, &mut reader, &job_id);
    assert_eq!(status["state"], "failed");
    assert_eq!(status["error"]["code"], "missing_field");
    assert_eq!(status["error"]["details"]["field"], "group");

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "ratings.importStatus",
        json!({ "jobId": "no-such-job" }),
    );
    assert_eq!(error["code"], "not_found");

    let error = request_err(&mut stdin, &mut reader, "3", "ratings.importStart", json!({}));
    assert_eq!(error["code"], "bad_params");
}
