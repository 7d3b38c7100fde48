//! Sources of macro definitions and copy members that are not in the open code.

use std::collections::HashMap;
use std::path::PathBuf;
use lsp_types as lsp;

/// A member found in a library
pub struct LibraryMember {
    /// URI of the member, used as its file name in the index
    pub uri: String,
    pub text: String
}

/// Anything that can look up a member by name.
/// Names are compared without regard to case.
pub trait Library {
    fn get(&self,name: &str) -> Option<LibraryMember>;
}

/// Members held in memory, mostly for tests and for clients that send buffers
pub struct MemoryLibrary {
    members: HashMap<String,(String,String)>
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self { members: HashMap::new() }
    }
    pub fn add(&mut self,name: &str,uri: &str,text: &str) {
        self.members.insert(name.to_uppercase(),(uri.to_string(),text.to_string()));
    }
}

impl Library for MemoryLibrary {
    fn get(&self,name: &str) -> Option<LibraryMember> {
        self.members.get(&name.to_uppercase()).map(|(uri,text)| LibraryMember {
            uri: uri.clone(),
            text: text.clone()
        })
    }
}

/// Members are files named after the member, with or without an extension,
/// in any of a list of directories.  The first directory with a match wins.
pub struct DirectoryLibrary {
    dirs: Vec<PathBuf>
}

impl DirectoryLibrary {
    pub fn new(dirs: &[String]) -> Self {
        Self { dirs: dirs.iter().map(PathBuf::from).collect() }
    }
    fn find(&self,name: &str) -> Option<PathBuf> {
        let opt = glob::MatchOptions {
            case_sensitive: false,
            require_literal_leading_dot: false,
            require_literal_separator: true
        };
        for dir in &self.dirs {
            for patt in [dir.join(name),dir.join([name,".*"].concat())] {
                let globable = match patt.as_os_str().to_str() {
                    Some(g) => g.to_string(),
                    None => {
                        log::warn!("directory {} could not be globbed",dir.display());
                        continue;
                    }
                };
                if let Ok(paths) = glob::glob_with(&globable,opt) {
                    if let Some(path) = paths.flatten().find(|p| p.is_file()) {
                        return Some(path);
                    }
                }
            }
        }
        None
    }
}

impl Library for DirectoryLibrary {
    fn get(&self,name: &str) -> Option<LibraryMember> {
        let path = self.find(name)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("could not read {}: {}",path.display(),e);
                return None;
            }
        };
        let full_path = std::fs::canonicalize(&path).unwrap_or(path.clone());
        let uri = match lsp::Url::from_file_path(&full_path) {
            Ok(u) => u.to_string(),
            Err(_) => full_path.display().to_string()
        };
        log::debug!("library member {} found at {}",name,uri);
        Some(LibraryMember { uri, text })
    }
}
