// Copyright 2014 Nick Fitzgerald
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thin standalone driver, playing the role of `fe.c`'s `main()`
//! under `FE_STANDALONE`: given a file argument, reads and evaluates
//! every form in it and exits; with no argument, runs an interactive
//! read-eval-print loop over stdin.
//!
//! Deliberately small and outside the library's tested core — this is
//! a demonstration of the embedder API, not part of the interpreter
//! itself.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use emblisp::{Context as FeContext, StrSource, Writer, DEFAULT_CAPACITY};

#[derive(Parser)]
#[command(name = "emblisp-repl", about = "Read-eval-print loop for the emblisp interpreter")]
struct Cli {
    /// Source file to evaluate non-interactively; omit to start a REPL.
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    pretty_env_logger::try_init().ok();
    let cli = Cli::parse();
    let mut ctx = FeContext::open(DEFAULT_CAPACITY);

    match cli.file {
        Some(path) => run_file(&mut ctx, &path),
        None => run_repl(&mut ctx),
    }
}

fn run_file(ctx: &mut FeContext, path: &PathBuf) -> Result<()> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("could not open input file {:?}", path))?;
    let mut source = StrSource::new(&src);
    loop {
        let save = ctx.save_roots();
        match ctx.read(&mut source) {
            Ok(Some(form)) => {
                if let Err(e) = ctx.eval(form) {
                    bail!("error: {e}");
                }
            }
            Ok(None) => break,
            Err(e) => bail!("error: {e}"),
        }
        ctx.restore_roots(save);
    }
    Ok(())
}

fn run_repl(ctx: &mut FeContext) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("> ") {
            Ok(l) => l,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        let save = ctx.save_roots();
        let mut source = StrSource::new(&line);
        loop {
            match ctx.read(&mut source) {
                Ok(Some(form)) => match ctx.eval(form) {
                    Ok(v) => {
                        let mut buf: Vec<u8> = Vec::new();
                        let _ = ctx.write(v, &mut buf, false);
                        println!("{}", String::from_utf8_lossy(&buf));
                    }
                    Err(e) => {
                        println!("error: {e}");
                        break;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    println!("error: {e}");
                    break;
                }
            }
        }
        ctx.restore_roots(save);
    }
    Ok(())
}
