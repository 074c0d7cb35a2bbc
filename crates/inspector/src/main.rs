//! `stacking-inspector <dom.json> [stylesheet.css] [--json]`
//!
//! Loads a DOM snapshot in the `html` crate's JSON schema, optionally applies
//! an author stylesheet, and prints the stacking context tree of the document
//! element together with each context's ranked competitors.

use std::env;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Error, anyhow};
use css_stacking::{StackingConfig, StackingMaintainer, TreeSource as _};
use html::dom::DOM;
use log::{error, info};
use serde_json::Value;
use style_engine::{StyleEngine, StyledDocument};

const USAGE: &str = "usage: stacking-inspector <dom.json> [stylesheet.css] [--json]";

#[derive(Debug, PartialEq, Eq)]
struct Options {
    dom_path: PathBuf,
    stylesheet_path: Option<PathBuf>,
    json: bool,
}

impl Options {
    fn parse<I>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = String>,
    {
        let mut paths = Vec::new();
        let mut json = false;
        for arg in args {
            match arg.as_str() {
                "--json" => json = true,
                flag if flag.starts_with("--") => {
                    return Err(anyhow!("unknown flag `{flag}`\n{USAGE}"));
                }
                _ => paths.push(PathBuf::from(arg)),
            }
        }
        let mut paths = paths.into_iter();
        let dom_path = paths.next().ok_or_else(|| anyhow!(USAGE))?;
        let stylesheet_path = paths.next();
        if let Some(extra) = paths.next() {
            return Err(anyhow!("unexpected argument `{}`\n{USAGE}", extra.display()));
        }
        Ok(Self {
            dom_path,
            stylesheet_path,
            json,
        })
    }
}

/// Scan `dom_json` (styled by `stylesheet`) and render the report.
fn inspect(
    dom_json: &str,
    stylesheet: Option<&str>,
    json: bool,
    config: StackingConfig,
) -> Result<String, Error> {
    let value: Value = serde_json::from_str(dom_json).context("DOM snapshot is not valid JSON")?;
    let dom = DOM::from_json_value(&value)?;
    let mut engine = StyleEngine::new();
    if let Some(css) = stylesheet {
        let rules = engine.add_author_stylesheet(css);
        info!("stacking-inspector: loaded {rules} author rules");
    }
    let document = StyledDocument::from_parts(dom, engine);
    let root = document.root();
    let maintainer = StackingMaintainer::start(document, root, config)?;
    let contexts = maintainer.contexts();
    if json {
        Ok(serde_json::to_string_pretty(&contexts.to_json_value())?)
    } else {
        Ok(contexts.to_string())
    }
}

fn run() -> Result<(), Error> {
    let options = Options::parse(env::args().skip(1))?;
    let dom_json = fs::read_to_string(&options.dom_path)
        .with_context(|| format!("reading {}", options.dom_path.display()))?;
    let stylesheet = options
        .stylesheet_path
        .as_ref()
        .map(|path| fs::read_to_string(path).with_context(|| format!("reading {}", path.display())))
        .transpose()?;
    let report = inspect(
        &dom_json,
        stylesheet.as_deref(),
        options.json,
        StackingConfig::from_env(),
    )?;
    let mut out = io::stdout().lock();
    writeln!(out, "{}", report.trim_end())?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
