use chrono::{Duration, TimeZone, Utc};
use longhabit::commands::*;
use longhabit::config::{load_settings, SettingsPatch};
use longhabit::models::Theme;
use longhabit::storage::Store;
use tempfile::{tempdir, TempDir};

fn with_test_db<F>(f: F)
where
    F: FnOnce(&Store),
{
    let dir: TempDir = tempdir().unwrap();
    let store = Store::in_dir(dir.path()).unwrap();
    f(&store);
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

#[test]
fn test_add_and_list() {
    with_test_db(|store| {
        let id = cmd_add(store, "Test Task".into(), Some("Work".into()), Some(3), true, now()).unwrap();

        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].name, "Test Task");
        assert_eq!(tasks[0].category, Some("Work".into()));
        assert!(tasks[0].repeat_goal_enabled);
        assert_eq!(tasks[0].days_repeat, 3);
        assert!(tasks[0].remind_by_email);

        let out = cmd_list(store, &ListOptions::default(), now()).unwrap();
        assert!(out.contains("Test Task"));
        assert!(out.contains("never completed"));
    });
}

#[test]
fn test_list_empty_messages() {
    with_test_db(|store| {
        let out = cmd_list(store, &ListOptions::default(), now()).unwrap();
        assert_eq!(out, "No tasks added yet.");

        cmd_add(store, "Walk".into(), Some("Health".into()), None, false, now()).unwrap();
        let options = ListOptions { category: Some("Work".into()), ..Default::default() };
        assert_eq!(cmd_list(store, &options, now()).unwrap(), "No results.");
    });
}

#[test]
fn test_negative_goal_disables_it() {
    with_test_db(|store| {
        cmd_add(store, "Odd".into(), None, Some(-4), false, now()).unwrap();
        let tasks = store.load_tasks().unwrap();
        assert!(!tasks[0].repeat_goal_enabled);
        assert_eq!(tasks[0].days_repeat, 0);
    });
}

#[test]
fn test_empty_name_rejected() {
    with_test_db(|store| {
        assert!(cmd_add(store, "   ".into(), None, None, false, now()).is_err());
        assert!(store.load_tasks().unwrap().is_empty());
    });
}

#[test]
fn test_done_and_undo() {
    with_test_db(|store| {
        let id = cmd_add(store, "Run".into(), None, Some(2), false, now()).unwrap();
        let first = now() - Duration::days(5);
        let second = now() - Duration::days(1);

        cmd_done(store, id, second).unwrap();
        let task = cmd_done(store, id, first).unwrap();
        assert_eq!(task.history.len(), 2);
        assert_eq!(task.last_completed(), Some(second));

        assert_eq!(cmd_undo(store, id).unwrap(), Some(second));
        let task = store.load_task(id).unwrap().unwrap();
        assert_eq!(task.history, vec![first]);

        assert_eq!(cmd_undo(store, id).unwrap(), Some(first));
        assert_eq!(cmd_undo(store, id).unwrap(), None);
    });
}

#[test]
fn test_done_unknown_task() {
    with_test_db(|store| {
        let err = cmd_done(store, 42, now()).unwrap_err();
        assert!(err.to_string().contains("42"));
    });
}

#[test]
fn test_late_task_listed_first() {
    with_test_db(|store| {
        let relaxed = cmd_add(store, "Relaxed".into(), None, Some(30), false, now()).unwrap();
        let late = cmd_add(store, "Late".into(), None, Some(1), false, now()).unwrap();
        cmd_done(store, relaxed, now() - Duration::days(1)).unwrap();
        cmd_done(store, late, now() - Duration::days(4)).unwrap();

        let out = cmd_list(store, &ListOptions::default(), now()).unwrap();
        let late_pos = out.find("Late").unwrap();
        let relaxed_pos = out.find("Relaxed").unwrap();
        assert!(late_pos < relaxed_pos);
        assert!(out.contains("3 days late"));
        assert!(out.contains("29 days left"));
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|store| {
        let id = cmd_add(store, "Read".into(), Some("Home".into()), Some(2), false, now()).unwrap();
        let edit = TaskEdit {
            name: Some("Read a book".into()),
            category: Some(String::new()),
            every: Some(10),
            remind_by_email: Some(true),
            ..Default::default()
        };
        let task = cmd_edit(store, id, edit).unwrap();
        assert_eq!(task.name, "Read a book");
        assert_eq!(task.category, None);
        assert_eq!(task.days_repeat, 10);
        assert!(task.remind_by_email);

        let off = TaskEdit { goal_enabled: Some(false), ..Default::default() };
        let task = cmd_edit(store, id, off).unwrap();
        assert!(!task.repeat_goal_enabled);
        assert_eq!(task.days_repeat, 10);
        assert_eq!(store.load_task(id).unwrap().unwrap(), task);
    });
}

#[test]
fn test_remove_task() {
    with_test_db(|store| {
        let a = cmd_add(store, "A".into(), None, None, false, now()).unwrap();
        let b = cmd_add(store, "B".into(), None, None, false, now()).unwrap();
        cmd_remove(store, a).unwrap();
        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, b);
        assert!(cmd_remove(store, a).is_err());

        // ids are not reused while a higher one exists
        let c = cmd_add(store, "C".into(), None, None, false, now()).unwrap();
        assert_eq!(c, b + 1);
    });
}

#[test]
fn test_categories() {
    with_test_db(|store| {
        cmd_add(store, "A".into(), Some("Work".into()), None, false, now()).unwrap();
        cmd_add(store, "B".into(), Some("Home".into()), None, false, now()).unwrap();
        cmd_add(store, "C".into(), Some("Work".into()), None, false, now()).unwrap();
        cmd_add(store, "D".into(), None, None, false, now()).unwrap();
        assert_eq!(cmd_categories(store).unwrap(), vec!["Home".to_string(), "Work".to_string()]);
    });
}

#[test]
fn test_settings_and_email_column() {
    with_test_db(|store| {
        cmd_add(store, "Floss".into(), None, Some(1), true, now()).unwrap();
        let out = cmd_list(store, &ListOptions::default(), now()).unwrap();
        assert!(!out.contains("yes"));

        let patch = SettingsPatch {
            remind_email: Some("me@example.com".into()),
            remind_by_email_enabled: Some(true),
            theme: Some(Theme::Light),
        };
        cmd_settings_set(store, patch).unwrap();
        let settings = load_settings(store).unwrap();
        assert!(settings.remind_by_email_enabled);
        assert_eq!(settings.theme, Theme::Light);

        let out = cmd_list(store, &ListOptions::default(), now()).unwrap();
        assert!(out.contains("yes"));
        assert!(cmd_settings_show(store).unwrap().contains("me@example.com"));

        let bad = SettingsPatch { remind_email: Some("not-an-email".into()), ..Default::default() };
        assert!(cmd_settings_set(store, bad).is_err());
        assert_eq!(load_settings(store).unwrap(), settings);
    });
}

#[test]
fn test_history_and_reset() {
    with_test_db(|store| {
        let id = cmd_add(store, "Swim".into(), None, Some(7), false, now()).unwrap();
        assert!(cmd_history(store, id).unwrap().contains("never been completed"));
        cmd_done(store, id, now()).unwrap();
        assert!(cmd_history(store, id).unwrap().starts_with("Swim\n"));

        cmd_settings_set(store, SettingsPatch { theme: Some(Theme::Dark), ..Default::default() }).unwrap();
        cmd_reset(store).unwrap();
        assert!(store.load_tasks().unwrap().is_empty());
        assert_eq!(load_settings(store).unwrap().theme, Theme::System);
    });
}

#[test]
fn test_parse_completion_time() {
    let ts = parse_completion_time("2026-10-01T08:15:00+02:00").unwrap();
    assert_eq!(ts, Utc.with_ymd_and_hms(2026, 10, 1, 6, 15, 0).unwrap());
    assert!(parse_completion_time("2026-10-01").is_ok());
    assert!(parse_completion_time("yesterday").is_err());
}
