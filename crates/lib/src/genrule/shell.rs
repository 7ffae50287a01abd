use crate::platform::Os;

/// Interpreter argv prefix for running a command string on `platform`.
///
/// POSIX platforms use `posix_shell` with `-e` so the first failing command
/// aborts the script. Windows uses `cmd.exe /c`.
pub fn shell_argv(platform: Os, posix_shell: &str, command: &str) -> Vec<String> {
  if platform.is_posix() {
    vec![
      posix_shell.to_string(),
      "-e".to_string(),
      "-c".to_string(),
      command.to_string(),
    ]
  } else {
    vec!["cmd.exe".to_string(), "/c".to_string(), command.to_string()]
  }
}
