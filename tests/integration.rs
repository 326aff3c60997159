use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use jobsh::Shell;
use jobsh::config::Config;
use jobsh::jobs::JobStatus;
use nix::sys::signal::{Signal, kill};
use serial_test::serial;

fn shell() -> Shell {
    Shell::from_environment(Config::default_config())
}

fn status_of(line: &str) -> i32 {
    shell().run_line(line)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

macro_rules! status_test {
    ($name:ident, $line:expr, $status:expr) => {
        #[test]
        #[serial]
        fn $name() {
            assert_eq!(status_of($line), $status, "line: {}", $line);
        }
    };
}

// ── Statuses ──

status_test!(true_succeeds, "true", 0);
status_test!(false_fails, "false", 1);
status_test!(external_true, "/bin/sh -c 'exit 0'", 0);
status_test!(external_status_propagates, "/bin/sh -c 'exit 7'", 7);
status_test!(command_not_found, "definitely-not-a-command-xyz", 127);
status_test!(syntax_error, "| echo", 2);
status_test!(unterminated_quote, "echo 'open", 2);
status_test!(and_chain_stops, "false && true", 1);
status_test!(or_chain_recovers, "false || true", 0);
status_test!(pipefail_reports_failing_stage, "false | cat", 1);
status_test!(pipeline_last_status, "true | /bin/sh -c 'exit 3'", 3);
status_test!(test_builtin_in_chain, "[ a = a ] && test 1 -lt 2", 0);

// ── Short-circuiting ──

#[test]
#[serial]
fn and_or_short_circuit_observed_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let ran = dir.path().join("ran");
    let skipped = dir.path().join("skipped");
    let mut shell = shell();
    let line = format!(
        "false && echo no > {} ; true || echo no > {} ; false || echo yes > {}",
        skipped.display(),
        skipped.display(),
        ran.display()
    );
    assert_eq!(shell.run_line(&line), 0);
    assert!(!skipped.exists());
    assert_eq!(read(&ran), "yes\n");
}

// ── Variables ──

#[test]
#[serial]
fn variables_round_trip_through_children() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    shell.run_line("GREETING=hello");
    shell.run_line("export GREETING");
    let line = format!("/bin/sh -c 'echo $GREETING' > {}", out.display());
    assert_eq!(shell.run_line(&line), 0);
    assert_eq!(read(&out), "hello\n");
}

#[test]
#[serial]
fn unexported_variable_not_inherited() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    shell.run_line("JOBSH_LOCAL_ONLY=secret");
    let line = format!(
        "/bin/sh -c 'echo x${{JOBSH_LOCAL_ONLY}}x' > {}",
        out.display()
    );
    shell.run_line(&line);
    assert_eq!(read(&out), "xx\n");
}

#[test]
#[serial]
fn status_parameter_expands() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    shell.run_line("/bin/sh -c 'exit 4'");
    shell.run_line(&format!("echo $? > {}", out.display()));
    assert_eq!(read(&out), "4\n");
}

#[test]
#[serial]
fn variable_values_are_data_not_syntax() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let injected = dir.path().join("injected");
    let mut shell = shell();

    assert_eq!(shell.run_line(r#"X="it's""#), 0);
    assert_eq!(shell.run_line(&format!("echo $X > {}", out.display())), 0);
    assert_eq!(read(&out), "it's\n");

    let value = format!("a; echo injected > {}", injected.display());
    shell.vars_mut().set("X", &value);
    assert_eq!(shell.run_line(&format!("echo $X > {}", out.display())), 0);
    assert!(!injected.exists());
    assert_eq!(read(&out), format!("{value}\n"));

    shell.vars_mut().set("Q", r#"say "hi" | now"#);
    shell.run_line(&format!(r#"echo "$Q" > {}"#, out.display()));
    assert_eq!(read(&out), "say \"hi\" | now\n");
}

// ── Globbing ──

#[test]
#[serial]
fn glob_expands_sorted_and_keeps_literal_on_no_match() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.txt", "a.txt", ".hidden.txt", "c.log"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    let out = dir.path().join("out");
    let mut shell = shell();
    let base = dir.path().display();
    shell.run_line(&format!("echo {base}/*.txt > {}", out.display()));
    assert_eq!(read(&out), format!("{base}/a.txt {base}/b.txt\n"));

    shell.run_line(&format!("echo {base}/*.none > {}", out.display()));
    assert_eq!(read(&out), format!("{base}/*.none\n"));

    shell.run_line(&format!("echo '{base}/*.txt' > {}", out.display()));
    assert_eq!(read(&out), format!("{base}/*.txt\n"));
}

// ── Redirection and pipelines ──

#[test]
#[serial]
fn pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let out2 = dir.path().join("out2");
    let mut shell = shell();
    let line = format!(
        "echo a | tr a b > {} ; cat < {} > {}",
        out.display(),
        out.display(),
        out2.display()
    );
    assert_eq!(shell.run_line(&line), 0);
    assert_eq!(read(&out), "b\n");
    assert_eq!(read(&out2), "b\n");
}

#[test]
#[serial]
fn append_redirection() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("log");
    let mut shell = shell();
    shell.run_line(&format!("echo one > {}", out.display()));
    shell.run_line(&format!("echo two >> {}", out.display()));
    assert_eq!(read(&out), "one\ntwo\n");
}

#[test]
#[serial]
fn builtin_output_redirected_and_restored() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let mut shell = shell();
    assert_eq!(shell.run_line(&format!("echo hi > {}", first.display())), 0);
    assert_eq!(shell.run_line(&format!("pwd > {}", second.display())), 0);
    assert_eq!(read(&first), "hi\n");
    assert!(!read(&second).is_empty());
}

#[test]
#[serial]
fn builtin_inside_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    let line = format!("echo piped | cat > {}", out.display());
    assert_eq!(shell.run_line(&line), 0);
    assert_eq!(read(&out), "piped\n");
}

#[test]
#[serial]
fn missing_input_file_skips_segment_only() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("after");
    let mut shell = shell();
    let line = format!("cat < /no/such/input ; echo after > {}", out.display());
    assert_eq!(shell.run_line(&line), 0);
    assert_eq!(read(&out), "after\n");
}

// ── Builtins ──

#[test]
#[serial]
fn env_prints_exported_variables() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    shell.run_line("export JOBSH_SHARED=yes");
    shell.run_line("JOBSH_PRIVATE=no");
    shell.run_line(&format!("env > {}", out.display()));
    let text = read(&out);
    assert!(text.lines().any(|l| l == "JOBSH_SHARED=yes"));
    assert!(!text.contains("JOBSH_PRIVATE"));
}

#[test]
#[serial]
fn which_prints_resolved_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    assert_eq!(shell.run_line(&format!("which sh > {}", out.display())), 0);
    assert!(read(&out).trim_end().ends_with("/sh"));
    assert_eq!(shell.run_line("which definitely-not-a-command-xyz"), 1);
}

#[test]
#[serial]
fn clear_writes_escape_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    assert_eq!(shell.run_line(&format!("clear > {}", out.display())), 0);
    assert_eq!(fs::read(&out).unwrap(), b"\x1b[2J\x1b[H");
}

#[test]
#[serial]
fn quit_ends_the_session_like_exit() {
    let mut shell = shell();
    assert_eq!(shell.run_line("quit 3; echo unreachable"), 3);
    assert_eq!(shell.exit_request(), Some(3));
}

#[test]
#[serial]
fn ping_signals_a_background_job() {
    let mut shell = shell();
    shell.run_line("sleep 5 &");
    let job = shell.jobs().most_recent().unwrap().clone();
    let line = format!("ping {} 9", job.pid);
    assert_eq!(shell.run_line(&line), 0);
    assert!(wait_for_removal(&mut shell, job.pid));
}

// ── Aliases and source ──

#[test]
#[serial]
fn alias_expands_leading_word() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut shell = shell();
    shell.run_line("alias say='echo said'");
    shell.run_line(&format!("say it > {}", out.display()));
    assert_eq!(read(&out), "said it\n");
}

#[test]
#[serial]
fn source_runs_file_in_current_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script");
    fs::write(&script, "# comment\n\nSOURCED=yes\nfalse\n").unwrap();
    let mut shell = shell();
    assert_eq!(shell.run_line(&format!("source {}", script.display())), 1);
    assert_eq!(shell.vars().get("SOURCED").as_deref(), Some("yes"));
}

// ── Jobs ──

fn wait_for_status(shell: &mut Shell, pid: nix::unistd::Pid, status: JobStatus) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        shell.reap_jobs();
        if shell.jobs().find_by_pid(pid).map(|j| j.status) == Some(status) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

fn wait_for_removal(shell: &mut Shell, pid: nix::unistd::Pid) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        shell.reap_jobs();
        if shell.jobs().find_by_pid(pid).is_none() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
#[serial]
fn background_job_lifecycle() {
    let mut shell = shell();
    assert_eq!(shell.run_line("sleep 5 &"), 0);
    assert_eq!(shell.jobs().len(), 1);
    let job = shell.jobs().most_recent().unwrap().clone();
    assert_eq!(job.job_id, 1);
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(
        shell.vars().get("!"),
        Some(job.pid.as_raw().to_string())
    );

    kill(job.pid, Signal::SIGSTOP).unwrap();
    assert!(wait_for_status(&mut shell, job.pid, JobStatus::Stopped));

    assert_eq!(shell.run_line("bg 1"), 0);
    assert_eq!(
        shell.jobs().find_by_pid(job.pid).map(|j| j.status),
        Some(JobStatus::Running)
    );

    assert_eq!(shell.run_line("kill %1"), 0);
    assert!(wait_for_removal(&mut shell, job.pid));
    assert!(shell.jobs().is_empty());
}

#[test]
#[serial]
fn fg_waits_for_job() {
    let mut shell = shell();
    shell.run_line("sleep 0.2 &");
    assert_eq!(shell.jobs().len(), 1);
    assert_eq!(shell.run_line("fg"), 0);
    assert!(shell.jobs().is_empty());
}

#[test]
#[serial]
fn job_ids_are_not_reused() {
    let mut shell = shell();
    shell.run_line("sleep 5 &");
    let first = shell.jobs().most_recent().unwrap().clone();
    shell.run_line("kill -9 %1");
    assert!(wait_for_removal(&mut shell, first.pid));

    shell.run_line("sleep 5 &");
    let second = shell.jobs().most_recent().unwrap().clone();
    assert_eq!(second.job_id, 2);
    shell.run_line("kill -KILL %2");
    assert!(wait_for_removal(&mut shell, second.pid));
}

#[test]
#[serial]
fn background_builtin_runs_in_subshell() {
    let mut shell = shell();
    shell.run_line("SUB=1 &");
    let job = shell.jobs().most_recent().unwrap().clone();
    assert!(wait_for_removal(&mut shell, job.pid));
    assert_eq!(shell.vars().get("SUB"), None);
}

#[test]
#[serial]
fn foreground_stop_registers_job() {
    let mut shell = shell();
    let status = shell.run_line("/bin/sh -c 'kill -STOP $$'");
    assert_eq!(status, 128 + Signal::SIGSTOP as i32);
    assert_eq!(shell.jobs().len(), 1);
    let job = shell.jobs().most_recent().unwrap().clone();
    assert_eq!(job.status, JobStatus::Stopped);

    kill(job.pid, Signal::SIGKILL).unwrap();
    assert!(wait_for_removal(&mut shell, job.pid));
}

#[test]
#[serial]
fn signal_death_maps_to_128_plus_signal() {
    assert_eq!(status_of("/bin/sh -c 'kill -9 $$'"), 137);
    assert_eq!(status_of("/bin/sh -c 'kill -TERM $$'"), 143);
}

#[test]
#[serial]
fn fg_resumes_stopped_job() {
    let mut shell = shell();
    shell.run_line("sleep 0.3 &");
    let job = shell.jobs().most_recent().unwrap().clone();
    kill(job.pid, Signal::SIGSTOP).unwrap();
    assert!(wait_for_status(&mut shell, job.pid, JobStatus::Stopped));

    assert_eq!(shell.run_line("fg 1"), 0);
    assert!(shell.jobs().is_empty());
}
