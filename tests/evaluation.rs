use std::fs;
use std::path::Path;

use indicatif::ProgressBar;
use persona_eval::config::EvalConfig;
use persona_eval::evaluate::{mean_squared_error, Evaluator, ResponseDir};
use persona_eval::reference::ReferenceFrame;
use persona_eval::report::{write_csv, write_issues};

const SURVEY: &str = "\
F7lA1,F1,F2,F3
4,1,2,5
4,2,2,5
4,1,3,
1,3,1,2
1,3,1,2
";

const JEWISH: &str = r#"{
    "run_1": {"F1": "1", "F2": "2: Somewhat", "F3": "5"},
    "run_2": {"F1": "Option 1", "F2": "I can't say", "F3": "5"},
    "run_3": {"F1": "2", "F2": "3", "F3": "4"}
}"#;

fn config(dir: &Path, group_column: &str) -> EvalConfig {
    let json = format!(
        r#"{{
            "reference": "{survey}",
            "responses_dir": "{responses}",
            "runs": 3,
            "excluded_questions": ["F3"],
            "groups": [
                {{"name": "Jewish", "predicate": {{"eq": {{"column": "{group_column}", "value": 4}}}}}},
                {{"name": "Other", "predicate": {{"eq": {{"column": "{group_column}", "value": 1}}}}}}
            ]
        }}"#,
        survey = dir.join("survey.csv").display(),
        responses = dir.join("responses").display(),
    );
    let path = dir.join("eval.json");
    fs::write(&path, json).unwrap();
    EvalConfig::load(&path).unwrap()
}

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("survey.csv"), SURVEY).unwrap();
    fs::create_dir(dir.path().join("responses")).unwrap();
    // only Jewish has model output; Other is skipped
    fs::write(dir.path().join("responses/Jewish_3_LLM_Output.json"), JEWISH).unwrap();
    dir
}

fn evaluator<'f>(frame: &'f ReferenceFrame, cfg: &EvalConfig) -> Evaluator<'f, ResponseDir> {
    Evaluator::new(
        frame,
        &cfg.groups,
        ResponseDir::from_config(cfg),
        cfg.excluded_questions.clone(),
        cfg.epsilon,
    )
    .unwrap()
}

#[test]
fn unknown_group_column_aborts_before_loading_outputs() {
    let dir = setup();
    // no model output anywhere: only a config error can explain the failure
    fs::remove_dir_all(dir.path().join("responses")).unwrap();
    let cfg = config(dir.path(), "F7lA9");
    let frame = ReferenceFrame::from_csv(&cfg.reference).unwrap();

    let err = Evaluator::new(
        &frame,
        &cfg.groups,
        ResponseDir::from_config(&cfg),
        cfg.excluded_questions.clone(),
        cfg.epsilon,
    )
    .err()
    .unwrap();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("F7lA9"));
}

#[test]
fn stats_report_skips_missing_group() {
    let dir = setup();
    let cfg = config(dir.path(), "F7lA1");
    let frame = ReferenceFrame::from_csv(&cfg.reference).unwrap();
    let eval = evaluator(&frame, &cfg);

    let report = eval
        .run(&ProgressBar::hidden(), |e, g, issues| e.compare_group(g, issues))
        .unwrap();

    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].starts_with("Other:"));

    let questions: Vec<_> = report.rows.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(questions, ["F1", "F2"]);
    assert!(report.rows.iter().all(|r| r.group == "Jewish"));

    let f1 = &report.rows[0];
    assert!(f1.chi_square.abs() < 1e-9);
    assert!(f1.js_divergence.abs() < 1e-6);

    let f2 = &report.rows[1];
    assert!((f2.chi_square - 0.125).abs() < 1e-9);
    assert!(f2.js_divergence > 0.0);

    // two questions: coefficient defined, p-value not
    assert_eq!(f2.spearman, Some(1.0));
    assert_eq!(f2.spearman_p_value, None);

    let out = dir.path().join("results/stats_comparison.csv");
    write_csv(&out, &report.rows).unwrap();
    let issues = write_issues(&out, &report.issues).unwrap().unwrap();
    assert!(issues.ends_with("stats_comparison.issues.json"));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Group,Question,Chi-Square,"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn agreement_report() {
    let dir = setup();
    let cfg = config(dir.path(), "F7lA1");
    let frame = ReferenceFrame::from_csv(&cfg.reference).unwrap();
    let eval = evaluator(&frame, &cfg);

    let report = eval
        .run(&ProgressBar::hidden(), |e, g, issues| e.agreement_group(g, issues))
        .unwrap();
    assert_eq!(report.rows.len(), 1);

    let row = &report.rows[0];
    // F1 answers 1,1,2 vs mode 1; F2 answers 2,3 vs mode 2
    assert!((row.accuracy - 60.0).abs() < 1e-9);
    assert!((row.weighted_alignment - 800.0 / 15.0).abs() < 1e-9);
    let tau = row.rank_correlation.unwrap();
    assert!((tau - 3.0 / 20f64.sqrt()).abs() < 1e-9);
}

#[test]
fn summary_and_mse() {
    let dir = setup();
    let cfg = config(dir.path(), "F7lA1");
    let frame = ReferenceFrame::from_csv(&cfg.reference).unwrap();
    let eval = evaluator(&frame, &cfg);

    let report = eval
        .run(&ProgressBar::hidden(), |e, g, issues| e.summarise_group(g, issues))
        .unwrap();
    assert_eq!(report.rows.len(), 2);

    let f1 = &report.rows[0];
    assert_eq!(f1.variable, "F1");
    assert!((f1.model_mean - 4.0 / 3.0).abs() < 1e-12);
    assert!((f1.model_sd.unwrap() - (1.0f64 / 3.0).sqrt()).abs() < 1e-12);
    assert!(f1.sd_difference.unwrap().abs() < 1e-12);
    assert!(f1.squared_error < 1e-12);

    let f2 = &report.rows[1];
    assert!((f2.model_mean - 2.5).abs() < 1e-12);
    assert!((f2.survey_mean - 7.0 / 3.0).abs() < 1e-12);

    let mse = mean_squared_error(&report.rows);
    assert_eq!(mse.len(), 1);
    assert_eq!(mse[0].0, "Jewish");
    assert!((mse[0].1 - 1.0 / 72.0).abs() < 1e-12);
}
