//! Command-line entry point: argument parsing, configuration discovery, and the main
//! refresh/poll/dispatch loop.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use scriptedit::editor::Editor;
use scriptedit::{Config, Engine, Error};

struct Args {
    config: Option<PathBuf>,
    eval: Option<String>,
    version: bool,
    files: Vec<String>,
}

fn parse_args() -> Result<Args, Error> {
    let mut args = Args { config: None, eval: None, version: false, files: Vec::new() };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = it.next().ok_or_else(|| Error::UnrecognizedOption(arg.clone()))?;
                args.config = Some(PathBuf::from(path));
            }
            "-e" | "--eval" => {
                args.eval = Some(it.next().ok_or_else(|| Error::UnrecognizedOption(arg.clone()))?);
            }
            "-v" | "--version" => args.version = true,
            other if other.starts_with('-') => return Err(Error::UnrecognizedOption(other.to_string())),
            other => args.files.push(other.to_string()),
        }
    }
    Ok(args)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = parse_args()?;

    if args.version {
        println!("scriptedit {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load()?;
    let editor = Rc::new(RefCell::new(Editor::new(config)));
    let engine = Engine::new(Rc::clone(&editor))?;

    let mut loaded_count = 0;
    if let Some(path) = &args.config {
        engine.load_file(path)?;
        loaded_count += 1;
    } else {
        for path in editor.borrow().config().script_dirs.clone() {
            if path.is_file() {
                match engine.load_file(&path) {
                    Ok(()) => loaded_count += 1,
                    Err(e) => log::warn!("failed to load {}: {e}", path.display()),
                }
            }
        }
    }
    if loaded_count == 0 {
        return Err(Box::new(Error::NoScriptLoaded));
    }

    for file in &args.files {
        editor.borrow_mut().create_buffer();
        editor.borrow_mut().open_path(file)?;
        engine.on_loaded(file)?;
    }

    if let Some(name) = &args.eval {
        engine.eval(name)?;
    }

    scriptedit::sys_register_resize_handler()?;
    let _raw_mode = scriptedit::RawMode::enable()?;
    editor.borrow_mut().update_window_size()?;

    run_main_loop(&editor, &engine)?;

    print!("\x1b[2J\x1b[1;1H");
    use std::io::Write;
    std::io::stdout().flush()?;
    Ok(())
}

/// `refresh_screen → poll up to ~1s for input → decode_key → on_key, or on_idle on timeout`.
fn run_main_loop(editor: &Rc<RefCell<Editor>>, engine: &Engine) -> Result<(), Error> {
    let mut stdout = std::io::stdout();
    loop {
        if editor.borrow().should_exit() {
            return Ok(());
        }
        editor.borrow_mut().refresh_screen(&mut stdout)?;

        let mut stdin = scriptedit::sys_stdin()?;
        // Each read blocks up to VTIME (0.1s); ten consecutive empty reads approximate the 1s
        // idle timeout described for the main loop without requiring a raw `select(2)` call.
        let mut idle_ticks = 0;
        let key = loop {
            if scriptedit::sys_has_window_size_changed() {
                editor.borrow_mut().update_window_size()?;
                break None;
            }
            match scriptedit::terminal_decode_key(&mut stdin)? {
                Some(key) => break Some(key),
                None => {
                    idle_ticks += 1;
                    if idle_ticks >= 10 {
                        break None;
                    }
                }
            }
        };

        match key {
            Some(key) => {
                engine.on_key(scriptedit::terminal::key_to_byte(key))?;
            }
            None => {
                engine.on_idle()?;
            }
        }
    }
}
