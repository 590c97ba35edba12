use pipesh::Interpreter;
use pipesh::config::{self, Args, Prompt};
use pipesh::io_adapters::{Editor, LineSource, ScriptLines, StdinLines};
use std::io::IsTerminal;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    config::init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "interpreter stopped");
            eprintln!("pipesh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut sh = Interpreter::default();
    let prompt = Prompt::new(args.prompt);

    let mut source: Box<dyn LineSource> = if !args.command.is_empty() {
        Box::new(ScriptLines::new(args.command))
    } else if std::io::stdin().is_terminal() {
        Box::new(Editor::new(!args.no_history)?)
    } else {
        Box::new(StdinLines::stdin())
    };

    sh.repl(source.as_mut(), &prompt)
}
