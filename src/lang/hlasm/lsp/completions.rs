//! Completion of variable symbols after `&`, sequence symbols after `.`,
//! and instructions in the operation field.

use std::collections::HashSet;
use lsp_types as lsp;
use regex::Regex;
use crate::lang::TextData;
use super::super::handbook::InstructionKind;
use super::super::macros::MacroDefinition;
use super::super::statement;
use super::hovers::{macro_hover,var_hover};
use super::{LspContext,MacroInfoPtr};

const RCH: &str = "unreachable was reached";

/// Prototype as a user would write the call, e.g. `&LBL NAME &P1,&K=DFLT`
pub fn macro_signature(def: &MacroDefinition) -> String {
    let mut ans = String::new();
    if let Some(lbl) = &def.label_param {
        ans += "&";
        ans += lbl.as_str();
        ans += " ";
    }
    ans += def.id.as_str();
    let params: Vec<String> = def.params.iter().map(|p| match &p.default {
        Some(d) => ["&",p.id.as_str(),"=",&d.get_value()].concat(),
        None => ["&",p.id.as_str()].concat()
    }).collect();
    if !params.is_empty() {
        ans += " ";
        ans += &params.join(",");
    }
    ans
}

/// Is the cursor in the operation field of a statement that does not continue another
pub fn should_complete_instr(data: &TextData,pos: &lsp::Position) -> bool {
    if pos.line > 0 && statement::is_continued(data.get_line(pos.line as usize - 1)) {
        return false;
    }
    let patt = Regex::new(r"^([^*][^*]\S*\s+\S+|\s+\S*)$").expect(RCH);
    patt.is_match(data.get_line_beginning(pos))
}

fn complete_var(lsp: &LspContext,scope: Option<&MacroInfoPtr>) -> Vec<lsp::CompletionItem> {
    let mut ans = Vec::new();
    let defs = match (scope,lsp.opencode()) {
        (Some(m),_) => &m.var_definitions,
        (None,Some(o)) => &o.variable_definitions,
        (None,None) => return ans
    };
    let mut seen = HashSet::new();
    for d in defs {
        if !seen.insert(d.name.clone()) {
            continue;
        }
        let label = ["&",d.name.as_str()].concat();
        ans.push(lsp::CompletionItem {
            label: label.clone(),
            kind: Some(lsp::CompletionItemKind::VARIABLE),
            detail: Some(var_hover(d)),
            insert_text: Some(label),
            ..Default::default()
        });
    }
    ans
}

fn complete_seq(lsp: &LspContext,scope: Option<&MacroInfoPtr>) -> Vec<lsp::CompletionItem> {
    let mut names: Vec<String> = match (scope,lsp.hlasm_ctx()) {
        (Some(m),_) => m.macro_definition.labels.keys().map(|k| k.to_string()).collect(),
        (None,Some(ctx)) => match ctx.scope_stack().first() {
            Some(s) => s.sequence_symbols.keys().map(|k| k.to_string()).collect(),
            None => Vec::new()
        },
        (None,None) => Vec::new()
    };
    names.sort();
    names.iter().map(|n| {
        let label = format!(".{}",n);
        lsp::CompletionItem {
            label: label.clone(),
            kind: Some(lsp::CompletionItemKind::REFERENCE),
            detail: Some("Sequence symbol".to_string()),
            insert_text: Some(label),
            ..Default::default()
        }
    }).collect()
}

fn complete_instr(lsp: &LspContext) -> Vec<lsp::CompletionItem> {
    let mut ans = Vec::new();
    let ctx = match lsp.hlasm_ctx() {
        Some(c) => c,
        None => return ans
    };
    let lower = lsp.settings().completions.lower_case;
    let case = |s: &str| match lower {
        true => s.to_lowercase(),
        false => s.to_string()
    };
    for ins in ctx.handbook().instructions() {
        let kind = match ins.kind {
            InstructionKind::Machine | InstructionKind::Mnemonic => lsp::CompletionItemKind::OPERATOR,
            InstructionKind::Assembler | InstructionKind::ConditionalAssembly => lsp::CompletionItemKind::KEYWORD
        };
        ans.push(lsp::CompletionItem {
            label: case(&ins.name),
            kind: Some(kind),
            detail: Some(ins.detail()),
            documentation: Some(lsp::Documentation::MarkupContent(lsp::MarkupContent {
                kind: lsp::MarkupKind::Markdown,
                value: format!("{}  \n{}",ins.brief,ins.desc)
            })),
            insert_text: Some(case(&ins.name)),
            ..Default::default()
        });
    }
    let mut macros: Vec<_> = ctx.macros().values().collect();
    macros.sort_by(|a,b| a.id.as_str().cmp(b.id.as_str()));
    for m in macros {
        ans.push(lsp::CompletionItem {
            label: case(m.id.as_str()),
            kind: Some(lsp::CompletionItemKind::FUNCTION),
            detail: Some(macro_signature(m)),
            documentation: Some(lsp::Documentation::MarkupContent(lsp::MarkupContent {
                kind: lsp::MarkupKind::Markdown,
                value: macro_hover(lsp,m)
            })),
            insert_text: Some(case(m.id.as_str())),
            ..Default::default()
        });
    }
    ans
}

pub fn completion(lsp: &LspContext,uri: &str,pos: lsp::Position,trigger: Option<char>) -> Vec<lsp::CompletionItem> {
    let file = match lsp.file(uri) {
        Some(f) => f,
        None => return Vec::new()
    };
    let last_char = match trigger {
        Some(c) => c,
        None => file.data.get_character_before(&pos)
    };
    let scope = file.find_scope(&pos);
    match last_char {
        '&' => complete_var(lsp,scope.as_ref()),
        '.' => complete_seq(lsp,scope.as_ref()),
        _ if should_complete_instr(&file.data,&pos) => complete_instr(lsp),
        _ => Vec::new()
    }
}
