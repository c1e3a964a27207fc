use crate::assembler::{self, BuildOptions, BuildOutput};
use ansi_term::Color::{Green, Red};
use anyhow::Context;
use std::io::{self, Write};
use std::path::PathBuf;
use structopt::StructOpt;

#[cfg(windows)]
pub fn terminal_init() {
    // Without ANSI support the output is merely uncoloured.
    let _ = ansi_term::enable_ansi_support();
}

#[cfg(not(windows))]
pub fn terminal_init() {}

#[derive(StructOpt, Debug)]
#[structopt(name = "svm")]
pub enum CommandRoot {
    /// Print the merged syntax tree of a module and its imports.
    Ast(SubcommandAst),
    /// Resolve and parse a module, listing every module it pulls in.
    Check(SubcommandCheck),
}

#[derive(StructOpt, Debug)]
pub struct BuildOpts {
    /// Directory containing one subdirectory per module.
    #[structopt(
        short = "I",
        long = "import-root",
        env = "SVM_IMPORT_ROOT",
        parse(from_os_str)
    )]
    import_root: Option<PathBuf>,

    /// Source file extension; may be repeated. Defaults to svm and asm.
    #[structopt(long = "ext", name = "EXT")]
    extensions: Vec<String>,

    /// Parse each module's files in name order instead of directory order.
    #[structopt(long)]
    sorted: bool,

    #[structopt(short, long)]
    debug: bool,

    #[structopt(name = "module")]
    module: String,
}

impl BuildOpts {
    fn options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();
        if let Some(root) = &self.import_root {
            options.import_root = root.clone();
        }
        if !self.extensions.is_empty() {
            options.extensions = self.extensions.clone();
        }
        options.sort_sources = self.sorted;
        options.debug = self.debug;
        options
    }

    fn build(&self) -> Result<BuildOutput, anyhow::Error> {
        let options = self.options();
        assembler::build(&options, &self.module).with_context(|| {
            format!(
                "failed to build module \"{}\" from '{}'",
                self.module,
                options.import_root.display()
            )
        })
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = "svm-asm")]
pub struct SubcommandAst {
    #[structopt(flatten)]
    build: BuildOpts,

    /// Write the tree here instead of to stdout.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
pub struct SubcommandCheck {
    #[structopt(flatten)]
    build: BuildOpts,
}

pub fn root(cmd: CommandRoot) -> Result<(), anyhow::Error> {
    match cmd {
        CommandRoot::Ast(scmd) => ast(scmd),
        CommandRoot::Check(scmd) => check(scmd),
    }
}

/// Renders a build the way `ast` prints it. Debug builds are prefixed with the
/// module list as comments.
pub fn render(output: &BuildOutput) -> String {
    let mut text = String::new();
    if output.debug {
        for module in &output.modules {
            text.push_str(&format!("; module {}\n", module));
        }
    }
    text.push_str(&output.ast.to_string());
    text
}

pub fn ast(cmd: SubcommandAst) -> Result<(), anyhow::Error> {
    let output = cmd.build.build()?;
    let text = render(&output);

    match cmd.output {
        Some(path) => std::fs::write(&path, text)
            .with_context(|| format!("could not write '{}'", path.display()))?,
        None => io::stdout()
            .write_all(text.as_bytes())
            .context("could not write to stdout")?,
    }

    Ok(())
}

pub fn check(cmd: SubcommandCheck) -> Result<(), anyhow::Error> {
    let output = cmd.build.build()?;
    for module in &output.modules {
        println!("{} {}", Green.paint("ok"), module);
    }
    Ok(())
}

pub fn report(err: &anyhow::Error) {
    eprintln!("{} {:#}", Red.bold().paint("error:"), err);
}
