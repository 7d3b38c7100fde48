//! ## Semantic queries
//!
//! Positions on the command line are zero based, the same as LSP positions.

use lsp_types as lsp;
use super::CommandError;
use crate::lang::hlasm::analyzer::{self,library::DirectoryLibrary};
use crate::lang::hlasm::lsp::LspContext;
use crate::lang::hlasm::settings::{self,Settings};
use crate::{DYNERR,STDRESULT};

const RCH: &str = "unreachable was reached";

/// Index of one open code file, and the URI the query is about
struct Session {
    index: LspContext,
    uri: String
}

fn file_uri(path: &str) -> String {
    let full_path = match std::fs::canonicalize(path) {
        Ok(p) => p,
        Err(_) => return path.to_string()
    };
    match lsp::Url::from_file_path(&full_path) {
        Ok(u) => u.to_string(),
        Err(_) => full_path.display().to_string()
    }
}

fn load_settings(cmd: &clap::ArgMatches) -> Result<Settings,DYNERR> {
    let mut ans = match cmd.get_one::<String>("config") {
        Some(path) => {
            let json = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("could not read settings {}: {}",path,e);
                    return Err(Box::new(CommandError::FileNotFound));
                }
            };
            settings::parse(&json)?
        },
        None => Settings::new()
    };
    if let Some(dirs) = cmd.get_many::<String>("lib") {
        ans.library = dirs.cloned().collect();
    }
    Ok(ans)
}

fn load(cmd: &clap::ArgMatches) -> Result<Session,DYNERR> {
    let path = cmd.get_one::<String>("file").expect(RCH);
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            log::error!("could not read {}: {}",path,e);
            return Err(Box::new(CommandError::FileNotFound));
        }
    };
    let settings = load_settings(cmd)?;
    let opencode_uri = file_uri(path);
    let library = DirectoryLibrary::new(&settings.library);
    let index = analyzer::analyze(&opencode_uri,&text,&library,&settings);
    let uri = match cmd.get_one::<String>("uri") {
        Some(u) => u.to_string(),
        None => opencode_uri
    };
    if index.file(&uri).is_none() {
        log::error!("{} was not visited while analyzing {}",uri,path);
        return Err(Box::new(CommandError::UnknownUri));
    }
    Ok(Session { index, uri })
}

fn position(cmd: &clap::ArgMatches) -> Result<lsp::Position,DYNERR> {
    match (cmd.get_one::<u32>("line"),cmd.get_one::<u32>("col")) {
        (Some(l),Some(c)) => Ok(lsp::Position::new(*l,*c)),
        _ => Err(Box::new(CommandError::InvalidCommand))
    }
}

fn print(value: serde_json::Value) -> STDRESULT {
    println!("{}",serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn outline(cmd: &clap::ArgMatches) -> STDRESULT {
    let session = load(cmd)?;
    match cmd.get_flag("native") {
        true => print(serde_json::to_value(session.index.document_symbol(&session.uri))?),
        false => print(serde_json::to_value(session.index.document_symbol_lsp(&session.uri))?)
    }
}

pub fn definition(cmd: &clap::ArgMatches) -> STDRESULT {
    let session = load(cmd)?;
    let pos = position(cmd)?;
    let loc = session.index.definition(&session.uri,pos);
    print(serde_json::to_value(loc.to_lsp())?)
}

pub fn references(cmd: &clap::ArgMatches) -> STDRESULT {
    let session = load(cmd)?;
    let pos = position(cmd)?;
    let locs: Vec<lsp::Location> = session.index.references(&session.uri,pos).iter().filter_map(|r| r.to_lsp()).collect();
    print(serde_json::to_value(locs)?)
}

pub fn hover(cmd: &clap::ArgMatches) -> STDRESULT {
    let session = load(cmd)?;
    let pos = position(cmd)?;
    print(serde_json::to_value(session.index.hover_lsp(&session.uri,pos))?)
}

pub fn complete(cmd: &clap::ArgMatches) -> STDRESULT {
    let session = load(cmd)?;
    let pos = position(cmd)?;
    let trigger = match cmd.get_one::<String>("trigger") {
        Some(t) if t.chars().count()==1 => t.chars().next(),
        Some(_) => {
            log::error!("trigger must be a single character");
            return Err(Box::new(CommandError::OutOfRange));
        },
        None => None
    };
    print(serde_json::to_value(session.index.completion(&session.uri,pos,trigger))?)
}
