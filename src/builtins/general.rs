use std::io::{self, Write};

use super::{Builtin, fail};
use crate::error::{STATUS_FAILURE, STATUS_SYNTAX};
use crate::exec::resolve_program;
use crate::shell::Shell;

/// `echo [-neE] [ARG...]`
pub struct Echo;

impl Builtin for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Display a line of text"
    }

    fn run(&self, _shell: &mut Shell, argv: &[String]) -> i32 {
        let mut newline = true;
        let mut escapes = false;
        let mut args = argv.get(1..).unwrap_or_default();

        while let Some((first, rest)) = args.split_first() {
            let Some(flags) = first.strip_prefix('-') else {
                break;
            };
            if flags.is_empty() || !flags.chars().all(|c| matches!(c, 'n' | 'e' | 'E')) {
                break;
            }
            for flag in flags.chars() {
                match flag {
                    'n' => newline = false,
                    'e' => escapes = true,
                    _ => escapes = false,
                }
            }
            args = rest;
        }

        let mut buf = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }
            if escapes {
                if interpret_escapes(arg, &mut buf) {
                    newline = false;
                    break;
                }
            } else {
                buf.extend_from_slice(arg.as_bytes());
            }
        }
        if newline {
            buf.push(b'\n');
        }

        match io::stdout().write_all(&buf) {
            Ok(()) => 0,
            Err(err) => fail("echo", err, STATUS_FAILURE),
        }
    }
}

/// Append `arg` to `out` with backslash escapes resolved.
/// Returns true when `\c` asked for output to stop.
pub fn interpret_escapes(arg: &str, out: &mut Vec<u8>) -> bool {
    let bytes = arg.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 == bytes.len() {
            out.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let escaped = bytes[i];
        i += 1;
        match escaped {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'e' => out.push(0x1b),
            b'\\' => out.push(b'\\'),
            b'c' => return true,
            b'0' => {
                let digits = bytes[i..]
                    .iter()
                    .take(3)
                    .take_while(|d| (b'0'..=b'7').contains(*d))
                    .count();
                let value = bytes[i..i + digits]
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                out.push(value as u8);
                i += digits;
            }
            b'x' => {
                let digits = bytes[i..]
                    .iter()
                    .take(2)
                    .take_while(|d| d.is_ascii_hexdigit())
                    .count();
                if digits == 0 {
                    out.extend_from_slice(b"\\x");
                } else {
                    let hex = &arg[i..i + digits];
                    out.push(u8::from_str_radix(hex, 16).unwrap_or(0));
                    i += digits;
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    false
}

/// `true`, `false` and `:`.
pub struct Constant {
    name: &'static str,
    status: i32,
    description: &'static str,
}

impl Constant {
    pub const TRUE: Constant = Constant {
        name: "true",
        status: 0,
        description: "Return success",
    };
    pub const FALSE: Constant = Constant {
        name: "false",
        status: 1,
        description: "Return failure",
    };
    pub const COLON: Constant = Constant {
        name: ":",
        status: 0,
        description: "Null command",
    };
}

impl Builtin for Constant {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn run(&self, _shell: &mut Shell, _argv: &[String]) -> i32 {
        self.status
    }
}

/// `exit [N]` and `quit [N]`: leave the shell with `N & 0xFF`, or `$?`
/// when omitted.
pub struct Exit {
    name: &'static str,
}

impl Exit {
    pub const EXIT: Exit = Exit { name: "exit" };
    pub const QUIT: Exit = Exit { name: "quit" };
}

impl Builtin for Exit {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Exit the shell"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        let status = match argv.get(1) {
            None => shell.last_status(),
            Some(arg) => match arg.parse::<i64>() {
                Ok(n) => (n & 0xFF) as i32,
                Err(_) => fail(
                    self.name,
                    format!("{arg}: numeric argument required"),
                    STATUS_SYNTAX,
                ),
            },
        };
        log::debug!("exit requested with {status}");
        shell.request_exit(status);
        status
    }
}

/// Erase the display, then move the cursor to the top left.
pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

/// `clear`
pub struct Clear;

impl Builtin for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn description(&self) -> &'static str {
        "Clear the terminal screen"
    }

    fn run(&self, _shell: &mut Shell, _argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        match out.write_all(CLEAR_SCREEN).and_then(|()| out.flush()) {
            Ok(()) => 0,
            Err(err) => fail("clear", err, STATUS_FAILURE),
        }
    }
}

/// `help`: list every builtin.
pub struct Help;

impl Builtin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Display help for builtins"
    }

    fn run(&self, shell: &mut Shell, _argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{} builtins:", env!("CARGO_PKG_NAME"));
        for builtin in shell.builtins().sorted() {
            let _ = writeln!(out, "  {:<10} {}", builtin.name(), builtin.description());
        }
        0
    }
}

/// `type NAME...`
pub struct Type;

impl Builtin for Type {
    fn name(&self) -> &'static str {
        "type"
    }

    fn description(&self) -> &'static str {
        "Indicate how a command would be interpreted"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() < 2 {
            return fail("type", "usage: type NAME...", STATUS_SYNTAX);
        }
        let search_path = shell.vars().get("PATH");
        let mut status = 0;
        let mut out = io::stdout().lock();
        for name in &argv[1..] {
            if let Some(value) = shell.aliases().get(name) {
                let _ = writeln!(out, "{name} is aliased to '{value}'");
            } else if shell.builtins().contains(name) {
                let _ = writeln!(out, "{name} is a shell builtin");
            } else if let Some(path) = resolve_program(name, search_path.as_deref())
                && path.exists()
            {
                let _ = writeln!(out, "{name} is {}", path.display());
            } else {
                status = fail("type", format!("{name}: not found"), STATUS_FAILURE);
            }
        }
        status
    }
}

/// `which NAME...`: print the executable each name resolves to on `$PATH`.
pub struct Which;

impl Builtin for Which {
    fn name(&self) -> &'static str {
        "which"
    }

    fn description(&self) -> &'static str {
        "Locate a command"
    }

    fn run(&self, shell: &mut Shell, argv: &[String]) -> i32 {
        if argv.len() < 2 {
            return fail("which", "usage: which NAME...", STATUS_FAILURE);
        }
        let search_path = shell.vars().get("PATH");
        let mut status = 0;
        let mut out = io::stdout().lock();
        for name in &argv[1..] {
            match resolve_program(name, search_path.as_deref()).filter(|p| p.exists()) {
                Some(path) => {
                    let _ = writeln!(out, "{}", path.display());
                }
                None => status = fail("which", format!("{name}: not found"), STATUS_FAILURE),
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(arg: &str) -> (Vec<u8>, bool) {
        let mut out = Vec::new();
        let stop = interpret_escapes(arg, &mut out);
        (out, stop)
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(escaped(r"a\tb\n").0, b"a\tb\n");
        assert_eq!(escaped(r"\\").0, b"\\");
        assert_eq!(escaped(r"\e[0m").0, b"\x1b[0m");
    }

    #[test]
    fn octal_and_hex() {
        assert_eq!(escaped(r"\0101").0, b"A");
        assert_eq!(escaped(r"\0").0, b"\0");
        assert_eq!(escaped(r"\x41\x7a").0, b"Az");
        assert_eq!(escaped(r"\xZ").0, b"\\xZ");
    }

    #[test]
    fn unknown_escape_kept() {
        assert_eq!(escaped(r"\q").0, b"\\q");
        assert_eq!(escaped("trailing\\").0, b"trailing\\");
    }

    #[test]
    fn backslash_c_stops() {
        let (out, stop) = escaped(r"ab\cde");
        assert_eq!(out, b"ab");
        assert!(stop);
    }

    #[test]
    fn exit_masks_status() {
        let mut shell = Shell::new(crate::config::Config::default_config());
        assert_eq!(Exit::EXIT.run(&mut shell, &["exit".into(), "257".into()]), 1);
        assert_eq!(shell.exit_request(), Some(1));
    }

    #[test]
    fn exit_rejects_non_numeric() {
        let mut shell = Shell::new(crate::config::Config::default_config());
        assert_eq!(Exit::QUIT.run(&mut shell, &["quit".into(), "abc".into()]), 2);
        assert_eq!(shell.exit_request(), Some(2));
    }

    #[test]
    fn constants() {
        let mut shell = Shell::new(crate::config::Config::default_config());
        assert_eq!(Constant::TRUE.run(&mut shell, &[]), 0);
        assert_eq!(Constant::FALSE.run(&mut shell, &[]), 1);
        assert_eq!(Constant::COLON.run(&mut shell, &[]), 0);
    }

    #[test]
    fn which_resolves_against_shell_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("mytool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut shell = Shell::new(crate::config::Config::default_config());
        shell
            .vars_mut()
            .set("PATH", dir.path().to_str().unwrap());
        assert_eq!(Which.run(&mut shell, &["which".into(), "mytool".into()]), 0);
        assert_eq!(Which.run(&mut shell, &["which".into(), "absent-tool".into()]), 1);
        assert_eq!(Which.run(&mut shell, &["which".into()]), 1);
    }
}
