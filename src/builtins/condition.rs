use std::fs;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};

use nix::unistd::{AccessFlags, access};

use super::{Builtin, fail};
use crate::error::STATUS_SYNTAX;
use crate::shell::Shell;

/// `test EXPR` and `[ EXPR ]`
pub struct Test {
    name: &'static str,
}

impl Test {
    pub const TEST: Test = Test { name: "test" };
    pub const BRACKET: Test = Test { name: "[" };
}

impl Builtin for Test {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Evaluate a conditional expression"
    }

    fn run(&self, _shell: &mut Shell, argv: &[String]) -> i32 {
        let mut args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
        if self.name == "[" {
            if args.last() != Some(&"]") {
                return fail("[", "missing `]'", STATUS_SYNTAX);
            }
            args.pop();
        }
        match evaluate(&args) {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(message) => fail(self.name, message, STATUS_SYNTAX),
        }
    }
}

/// Evaluate a `test` expression of up to four arguments.
fn evaluate(args: &[&str]) -> Result<bool, String> {
    match args {
        [] => Ok(false),
        [word] => Ok(!word.is_empty()),
        ["!", rest @ ..] => evaluate(rest).map(|v| !v),
        [op, operand] => unary(op, operand),
        [left, op, right] => binary(left, op, right),
        [first, ..] => Err(format!("{first}: too many arguments")),
    }
}

fn unary(op: &str, operand: &str) -> Result<bool, String> {
    let meta = || fs::metadata(operand).ok();
    Ok(match op {
        "-z" => operand.is_empty(),
        "-n" => !operand.is_empty(),
        "-e" => meta().is_some(),
        "-f" => meta().is_some_and(|m| m.is_file()),
        "-d" => meta().is_some_and(|m| m.is_dir()),
        "-p" => meta().is_some_and(|m| m.file_type().is_fifo()),
        "-s" => meta().is_some_and(|m| m.len() > 0),
        "-L" | "-h" => fs::symlink_metadata(operand).is_ok_and(|m| m.file_type().is_symlink()),
        "-r" => access(operand, AccessFlags::R_OK).is_ok(),
        "-w" => access(operand, AccessFlags::W_OK).is_ok(),
        "-x" => {
            access(operand, AccessFlags::X_OK).is_ok()
                || meta().is_some_and(|m| m.is_dir() && m.permissions().mode() & 0o111 != 0)
        }
        _ => return Err(format!("{op}: unary operator expected")),
    })
}

fn binary(left: &str, op: &str, right: &str) -> Result<bool, String> {
    match op {
        "=" | "==" => return Ok(left == right),
        "!=" => return Ok(left != right),
        _ => {}
    }
    let number = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| format!("{s}: integer expression expected"))
    };
    let check: fn(&i64, &i64) -> bool = match op {
        "-eq" => i64::eq,
        "-ne" => i64::ne,
        "-lt" => i64::lt,
        "-le" => i64::le,
        "-gt" => i64::gt,
        "-ge" => i64::ge,
        _ => return Err(format!("{op}: binary operator expected")),
    };
    Ok(check(&number(left)?, &number(right)?))
}
