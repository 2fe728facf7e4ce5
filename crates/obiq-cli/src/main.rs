use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use obiq::{RunOptions, Runner, exit_status};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: obiq <script.obq> [args...]");
        return ExitCode::FAILURE;
    };

    let code = match fs::read_to_string(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: cannot read '{file_path}': {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(code, file_path) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let project_root = Path::new(file_path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    // The system library root defaults to the project root; OBIQ_LIB
    // points it at an installed library tree.
    let system_root = env::var_os("OBIQ_LIB")
        .map_or_else(|| project_root.clone(), PathBuf::from);

    let options = RunOptions {
        system_root,
        project_root,
        args: Some(args[2..].to_vec()),
    };

    match runner.run(&options) {
        Ok(value) => {
            let status = exit_status(&value).clamp(0, 255);
            ExitCode::from(u8::try_from(status).expect("clamped to u8 range"))
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
