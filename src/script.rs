//! # Scripting bridge
//!
//! Registers the fixed table of host-callable editing primitives as Lua globals, and resolves/
//! invokes the host-invoked callbacks (`on_key`, `on_loaded`, `on_saved`, `on_idle`) by name. Key
//! binding policy itself lives entirely in the user's Lua script; the core only exposes the
//! primitives and calls the callbacks. Every primitive takes and returns simple scalars
//! (string/number/boolean/nil), never a borrowed reference to core data.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::{Lua, MultiValue, Value, Variadic};

use crate::buffer::Direction;
use crate::editor::Editor;
use crate::Error;

pub struct Engine {
    lua: Lua,
}

impl Engine {
    /// Build a fresh Lua runtime and register every host operation against `editor`.
    pub fn new(editor: Rc<RefCell<Editor>>) -> Result<Self, Error> {
        let lua = Lua::new();
        register(&lua, editor)?;
        Ok(Self { lua })
    }

    /// Load and execute a Lua script file (a user's key-binding/behavior script).
    pub fn load_file(&self, path: &Path) -> Result<(), Error> {
        let src = std::fs::read_to_string(path)?;
        self.lua.load(&src).set_name(path.to_string_lossy()).exec().map_err(Error::from)
    }

    /// Compile and execute a snippet of Lua, as used by the `eval()` primitive's prompt.
    pub fn eval(&self, code: &str) -> Result<String, Error> {
        let result: MultiValue = self.lua.load(code).eval().map_err(Error::from)?;
        Ok(result.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join(" "))
    }

    fn call_named(&self, name: &str, args: impl mlua::IntoLuaMulti) -> Result<bool, Error> {
        let globals = self.lua.globals();
        let Ok(func) = globals.get::<_, mlua::Function>(name) else {
            log::debug!("script callback {name:?} is not defined");
            return Ok(false);
        };
        func.call::<_, ()>(args).map_err(Error::from)?;
        Ok(true)
    }

    /// Invoke the `on_key(byte)` callback. A missing callback is not an error: the key is simply
    /// not bound to anything.
    pub fn on_key(&self, byte: u8) -> Result<bool, Error> { self.call_named("on_key", byte as i64) }

    pub fn on_loaded(&self, file_name: &str) -> Result<bool, Error> {
        self.call_named("on_loaded", file_name.to_string())
    }

    pub fn on_saved(&self, file_name: &str) -> Result<bool, Error> {
        self.call_named("on_saved", file_name.to_string())
    }

    pub fn on_idle(&self) -> Result<bool, Error> { self.call_named("on_idle", ()) }
}

/// Block for a single keypress on `stdin` (no ~0.1s poll timeout), decoded the same way the main
/// loop decodes keys, and mapped onto the same one-byte encoding used for `on_key`.
fn blocking_read_key() -> Result<u8, Error> {
    loop {
        let mut stdin = crate::sys::stdin()?;
        if let Some(key) = crate::terminal::decode_key(&mut stdin)? {
            return Ok(crate::terminal::key_to_byte(key));
        }
    }
}

fn register(lua: &Lua, editor: Rc<RefCell<Editor>>) -> Result<(), Error> {
    let globals = lua.globals();

    // --- point introspection ---------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "at",
            lua.create_function(move |lua, ()| match ed.borrow().current_buffer().byte_at_cursor() {
                Some(b) => lua.create_string([b]).map(Value::String),
                None => Ok(Value::Nil),
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set("dirty", lua.create_function(move |_, ()| Ok(ed.borrow().current_buffer().is_dirty()))?)?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "get_line",
            lua.create_function(move |lua, ()| {
                lua.create_string(ed.borrow().current_buffer().line_from_cursor()).map(Value::String)
            })?,
        )?;
    }

    // --- cursor motion --------------------------------------------------------------------------
    for (name, dir) in [
        ("left", Direction::Left),
        ("right", Direction::Right),
        ("up", Direction::Up),
        ("down", Direction::Down),
    ] {
        let ed = Rc::clone(&editor);
        globals.set(
            name,
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().move_cursor(dir);
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "sol",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().move_to_line_start();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "eol",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().move_to_line_end();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "page_up",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().page_up();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "page_down",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().page_down();
                Ok(())
            })?,
        )?;
    }

    // --- text editing -------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "insert",
            lua.create_function(move |_, text: mlua::String| {
                let mut editor = ed.borrow_mut();
                for &b in text.as_bytes() {
                    editor.current_buffer_mut().insert_char(b);
                }
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "delete",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().delete_char();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "kill",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().delete_current_row();
                Ok(())
            })?,
        )?;
    }

    // --- raw key read ---------------------------------------------------------------------------
    {
        globals.set(
            "key",
            lua.create_function(move |lua, ()| {
                let byte = blocking_read_key().map_err(mlua::Error::external)?;
                lua.create_string([byte]).map(Value::String)
            })?,
        )?;
    }

    // --- marker / point get-set --------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "mark",
            lua.create_function(move |_, (x, y): (Option<i64>, Option<i64>)| {
                let mut editor = ed.borrow_mut();
                if let (Some(x), Some(y)) = (x, y) {
                    editor.current_buffer_mut().set_mark_raw(x as isize, y as isize);
                }
                let (mx, my) = editor.current_buffer().mark_raw();
                Ok((mx as i64, my as i64))
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "point",
            lua.create_function(move |_, (x, y): (Option<i64>, Option<i64>)| {
                let mut editor = ed.borrow_mut();
                if let (Some(x), Some(y)) = (x, y) {
                    let (x, y) = ((x - 1).max(0) as usize, (y - 1).max(0) as usize);
                    editor.current_buffer_mut().cursor_set(x, y);
                }
                let buffer = editor.current_buffer();
                Ok((buffer.cx as i64, buffer.cy as i64))
            })?,
        )?;
    }

    // --- selection ------------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "selection",
            lua.create_function(move |lua, ()| {
                let editor = ed.borrow();
                match editor.current_buffer().get_selection() {
                    Some(bytes) => lua.create_string(&bytes).map(Value::String),
                    None => Ok(Value::Nil),
                }
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "cut_selection",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().current_buffer_mut().cut_selection();
                Ok(())
            })?,
        )?;
    }

    // --- search ---------------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "search",
            lua.create_function(move |_, query: mlua::String| {
                let mut editor = ed.borrow_mut();
                let len = editor
                    .current_buffer_mut()
                    .find(query.as_bytes(), true)
                    .map_or(0, |(_, _, len)| len);
                Ok(len as i64)
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "find",
            lua.create_function(move |_, ()| {
                let mut editor = ed.borrow_mut();
                let stdin = crate::sys::stdin().map_err(mlua::Error::external)?;
                let mut stdout = crate::sys::stdout();
                editor.enter_find_mode(stdin, &mut stdout).map_err(mlua::Error::external)
            })?,
        )?;
    }

    // --- undo -----------------------------------------------------------------------------------
    #[cfg(feature = "undo")]
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "undo",
            lua.create_function(move |_, ()| Ok(ed.borrow_mut().current_buffer_mut().undo_last()))?,
        )?;
    }
    #[cfg(not(feature = "undo"))]
    {
        globals.set(
            "undo",
            lua.create_function(move |_, ()| {
                log::warn!("undo support is not compiled in");
                Ok(false)
            })?,
        )?;
    }

    // --- syntax configuration ---------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "set_syntax_keywords",
            lua.create_function(move |_, keywords: Variadic<String>| {
                ed.borrow_mut().current_buffer_mut().syntax.set_keywords("custom", keywords.to_vec());
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "set_syntax_comments",
            lua.create_function(
                move |_, (single, open, close): (Option<String>, Option<String>, Option<String>)| {
                    ed.borrow_mut().current_buffer_mut().syntax.set_comments(
                        single.map(String::into_bytes),
                        open.map(String::into_bytes),
                        close.map(String::into_bytes),
                    );
                    Ok(())
                },
            )?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "syntax_highlight_numbers",
            lua.create_function(move |_, on: bool| {
                ed.borrow_mut().current_buffer_mut().syntax.set_highlight_numbers(on);
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "syntax_highlight_strings",
            lua.create_function(move |_, on: bool| {
                ed.borrow_mut().current_buffer_mut().syntax.set_highlight_strings(on);
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "tabsize",
            lua.create_function(move |_, size: Option<i64>| {
                let mut editor = ed.borrow_mut();
                if let Some(n) = size {
                    editor.current_buffer_mut().tab_size = n.max(1) as usize;
                    editor.current_buffer_mut().update_all_rows();
                }
                Ok(editor.current_buffer().tab_size as i64)
            })?,
        )?;
    }

    // --- buffer management ------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set("buffers", lua.create_function(move |_, ()| Ok(ed.borrow().buffer_count() as i64))?)?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "current_buffer",
            lua.create_function(move |_, ()| Ok(ed.borrow().current_index() as i64))?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "create_buffer",
            lua.create_function(move |_, ()| Ok(ed.borrow_mut().create_buffer() as i64))?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "kill_buffer",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().kill_current_buffer();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "next_buffer",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().next_buffer();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "prev_buffer",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().prev_buffer();
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "select_buffer",
            lua.create_function(move |_, index: i64| {
                ed.borrow_mut().select_buffer(index.max(0) as usize);
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "choose_buffer",
            lua.create_function(move |_, ()| {
                let mut editor = ed.borrow_mut();
                let stdin = crate::sys::stdin().map_err(mlua::Error::external)?;
                let mut stdout = crate::sys::stdout();
                editor.choose_buffer(stdin, &mut stdout).map_err(mlua::Error::external)
            })?,
        )?;
    }

    // --- file I/O ------------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "open",
            lua.create_function(move |_, path: Option<String>| {
                let mut editor = ed.borrow_mut();
                let path = match path {
                    Some(path) => Some(path),
                    None => {
                        let stdin = crate::sys::stdin().map_err(mlua::Error::external)?;
                        let mut stdout = crate::sys::stdout();
                        editor.get_input(stdin, &mut stdout, "Open: ").map_err(mlua::Error::external)?
                    }
                };
                if let Some(path) = path {
                    editor.create_buffer();
                    editor.open_path(&path).map_err(mlua::Error::external)?;
                }
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "save",
            lua.create_function(move |_, path: Option<String>| {
                ed.borrow_mut().save_current(path);
                Ok(())
            })?,
        )?;
    }

    // --- prompt / eval ---------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "prompt",
            lua.create_function(move |_, text: String| {
                let mut editor = ed.borrow_mut();
                let stdin = crate::sys::stdin().map_err(mlua::Error::external)?;
                let mut stdout = crate::sys::stdout();
                Ok(editor.get_input(stdin, &mut stdout, &text).map_err(mlua::Error::external)?)
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        let lua_handle = lua.clone();
        globals.set(
            "eval",
            lua.create_function(move |_, ()| {
                let text = {
                    let mut editor = ed.borrow_mut();
                    let stdin = crate::sys::stdin().map_err(mlua::Error::external)?;
                    let mut stdout = crate::sys::stdout();
                    editor.get_input(stdin, &mut stdout, "Eval: ").map_err(mlua::Error::external)?
                };
                if let Some(text) = text {
                    if let Err(e) = lua_handle.load(&text).exec() {
                        ed.borrow_mut().set_status(format!("{e}"));
                    }
                }
                Ok(())
            })?,
        )?;
    }

    // --- status / control ------------------------------------------------------------------------
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "status",
            lua.create_function(move |_, msg: String| {
                ed.borrow_mut().set_status(msg);
                Ok(())
            })?,
        )?;
    }
    {
        let ed = Rc::clone(&editor);
        globals.set(
            "exit",
            lua.create_function(move |_, ()| {
                ed.borrow_mut().request_exit();
                Ok(())
            })?,
        )?;
    }

    Ok(())
}
