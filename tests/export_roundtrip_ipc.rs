mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

fn name_scores(result: &serde_json::Value) -> Vec<(String, f64)> {
    result["ratings"]
        .as_array()
        .expect("ratings")
        .iter()
        .map(|r| {
            (
                r["studentName"].as_str().expect("name").to_string(),
                r["score"].as_f64().expect("score"),
            )
        })
        .collect()
}

#[test]
fn subject_export_reimports_into_another_workspace() {
    let source = temp_dir("ratingd-export-source");
    let target = temp_dir("ratingd-export-target");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &source);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "ratings.importText",
        json!({ "text": "Группа: CS-101\nДисциплина: Math\n1 Ivanov Ivan 85.5\n2 Petrova Anna 90\n3 Sidorov 71,25\n" }),
    );
    let before = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "ratings.list",
        json!({ "groupCode": "CS-101", "subjectCode": "Math" }),
    );
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "ratings.exportText",
        json!({ "groupCode": "CS-101", "subjectCode": "Math", "layout": "subject" }),
    );
    let text = exported["text"].as_str().expect("text").to_string();
    assert!(text.starts_with("Рейтинги студентов по дисциплине\n"));
    assert!(text.contains("3 Sidorov 71.25"));

    select_workspace(&mut stdin, &mut reader, &target);
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "ratings.importText",
        json!({ "text": text }),
    );
    assert_eq!(imported["report"]["rowsImported"], 3);
    let after = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "ratings.list",
        json!({ "groupCode": "CS-101", "subjectCode": "Math" }),
    );

    let before = name_scores(&before);
    let after = name_scores(&after);
    assert_eq!(before.len(), after.len());
    for ((n1, s1), (n2, s2)) in before.iter().zip(after.iter()) {
        assert_eq!(n1, n2);
        assert!((s1 - s2).abs() < 0.01);
    }
}

#[test]
fn summary_export_lists_averages_and_is_refused_on_import() {
    let workspace = temp_dir("ratingd-export-summary");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    for (i, text) in [
        "Группа: CS-101\nДисциплина: Math\n1 Ivanov 85.5\n2 Petrov 90\n",
        "Группа: CS-101\nДисциплина: Physics\n1 Ivanov 60\n",
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("import-{}", i),
            "ratings.importText",
            json!({ "text": text }),
        );
    }

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "ratings.exportText",
        json!({ "groupCode": "CS-101", "layout": "summary" }),
    );
    let text = exported["text"].as_str().expect("text").to_string();
    assert!(text.contains("Math 87.75"));
    assert!(text.contains("Physics 60.00"));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "ratings.importText",
        json!({ "text": text }),
    );
    assert_eq!(error["code"], "summary_report");

    let full = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "ratings.exportText",
        json!({ "groupCode": "CS-101", "layout": "full" }),
    );
    assert!(full["text"].as_str().expect("text").contains("Physics 1 Ivanov 60"));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "ratings.exportText",
        json!({ "groupCode": "CS-999", "layout": "full" }),
    );
    assert_eq!(error["code"], "not_found");

    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "ratings.exportText",
        json!({ "groupCode": "CS-101", "layout": "poster" }),
    );
    assert_eq!(error["code"], "bad_params");
}
