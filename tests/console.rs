use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tungsten_console::config::ConsoleSettings;
use tungsten_console::web::LogResponse;
use tungsten_console::{CommandOutcome, Console, ConsoleError, Rgba, Severity};

fn console_with(settings: ConsoleSettings) -> Arc<Console> {
    Console::new(ConsoleSettings { stack_traces: false, ..settings })
}

fn console() -> Arc<Console> {
    console_with(ConsoleSettings::default())
}

#[test]
fn test_echo_command() {
    let console = console();
    console
        .register_command("echo", "Print the arguments", |console, args| {
            console.log(args.join(" "), Severity::Info, false);
            Ok(())
        })
        .unwrap();

    let line = r#"echo hello "world now""#;
    assert_eq!(console.execute_command(line), CommandOutcome::Executed);

    let logs = console.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, format!("> {line}"));
    assert_eq!(logs[1].message, "hello world now");
    assert_eq!(console.command_history(), vec![line]);
}

#[test]
fn test_command_names_are_case_insensitive() {
    let console = console();
    console
        .register_command("Ping", "", |c, _| {
            c.info("pong");
            Ok(())
        })
        .unwrap();

    assert_eq!(console.execute_command("PING"), CommandOutcome::Executed);
    assert!(matches!(
        console.register_command("ping", "", |_, _| Ok(())),
        Err(ConsoleError::DuplicateCommand { .. })
    ));
}

#[test]
fn test_quoted_arguments_reach_handler() {
    let console = console();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    console
        .register_command("say", "", move |_, args| {
            sink.lock().unwrap().extend(args.iter().cloned());
            Ok(())
        })
        .unwrap();

    console.execute_command(r#"say "hello there" 'single quoted' bare"#);
    assert_eq!(*seen.lock().unwrap(), vec!["hello there", "single quoted", "bare"]);
}

#[test]
fn test_unknown_command_logs_error() {
    let console = console();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    console
        .register_command("echo", "", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let outcome = console.execute_command("bogus 1 2");

    assert_eq!(outcome, CommandOutcome::NotFound("bogus".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(console.command_history(), vec!["bogus 1 2"]);

    let errors: Vec<_> = console
        .logs()
        .into_iter()
        .filter(|e| e.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Command \"bogus\" not found.");
}

#[test]
fn test_concurrent_commands_do_not_interleave() {
    let console = console();
    for name in ["alpha", "beta"] {
        console
            .register_command(name, "", move |c, _| {
                for i in 0..100 {
                    c.log(format!("{name} {i}"), Severity::Info, false);
                }
                Ok(())
            })
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|name| {
            let console = console.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                console.execute_command(name)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), CommandOutcome::Executed);
    }

    let messages: Vec<String> = console.logs().into_iter().map(|e| e.message).collect();
    assert_eq!(messages.len(), 202);
    for name in ["alpha", "beta"] {
        let start = messages.iter().position(|m| *m == format!("> {name}")).unwrap();
        let block: Vec<String> = (0..100).map(|i| format!("{name} {i}")).collect();
        assert_eq!(messages[start + 1..start + 101], block[..]);
    }
}

#[test]
fn test_bounded_history_keeps_most_recent() {
    let console = console_with(ConsoleSettings { log_history_capacity: 5, ..Default::default() });
    for i in 0..12 {
        console.info(format!("line {i}"));
    }

    let messages: Vec<String> = console.logs().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["line 7", "line 8", "line 9", "line 10", "line 11"]);
}

#[test]
fn test_unbounded_history_keeps_everything() {
    let console = console_with(ConsoleSettings { log_history_capacity: 0, ..Default::default() });
    for i in 0..30 {
        console.info(format!("line {i}"));
    }
    for i in 0..20 {
        console.warning(format!("more {i}"));
    }
    assert_eq!(console.logs().len(), 50);
}

#[test]
fn test_logs_since_is_strictly_newer() {
    let console = console();
    console.info("first");
    let cutoff = console.logs()[0].timestamp;
    std::thread::sleep(std::time::Duration::from_millis(2));
    console.info("second");

    let newer = console.logs_since(cutoff);
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].message, "second");

    let latest = newer[0].timestamp;
    assert!(console.logs_since(latest).is_empty());
}

#[test]
fn test_save_history_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let console = console();
    console.info("<b>bold</b> move");
    console.error("failure");

    let path = console.save_history_to_file(dir.path(), "session", true).unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("session_"));
    assert!(file_name.ends_with(".log"));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "bold move\n\nfailure");
}

#[test]
fn test_save_history_keeps_markup_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let console = console();
    console.info("<i>styled</i>");

    let path = console.save_history_to_file(dir.path(), "raw", false).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "<i>styled</i>");
}

#[test]
fn test_save_history_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let console = console();

    let result = console.save_history_to_file(&missing, "session", true);
    assert!(matches!(result, Err(ConsoleError::InvalidPath { .. })));

    let logs = console.logs();
    assert_eq!(logs.last().unwrap().severity, Severity::Error);
    assert!(logs.last().unwrap().message.starts_with("Directory not found"));
}

#[test]
fn test_save_history_uses_default_directory() {
    let dir = tempfile::tempdir().unwrap();
    let history_dir = dir.path().join("history");
    let console = console_with(ConsoleSettings {
        history_dir: history_dir.clone(),
        ..Default::default()
    });
    console.info("kept");

    let path = console.save_history_to_file("", "auto", true).unwrap();
    assert!(history_dir.is_dir());
    assert!(path.starts_with(history_dir.to_string_lossy().replace('\\', "/")));
}

#[test]
fn test_log_response_round_trip() {
    let console = console();
    console.info("plain");
    console.log("traced", Severity::Exception, true);
    console.log_colored("tinted", Rgba::new(0x11, 0x22, 0x33, 0xff), Rgba::BLACK, false);

    let response = LogResponse { logs: console.logs() };
    let json = serde_json::to_string(&response).unwrap();
    let decoded: LogResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, response);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let tinted = &value["logs"][2];
    assert_eq!(tinted["customColor"], true);
    assert_eq!(tinted["textColor"], "112233FF");
    assert_eq!(value["logs"][0]["customColor"], false);
    assert_eq!(value["logs"][1]["logType"], "Exception");
}
