//! Test of the document outline.

use lsp_types as lsp;
use super::super::analyzer::{self,library::MemoryLibrary};
use super::super::lsp::LspContext;
use super::super::lsp::document_symbols::{DocumentSymbolItem,DocumentSymbolKind};
use super::super::settings::Settings;

const OPENCODE: &str = "file:///src/prog.hlasm";

fn analyze(lines: &[&str],lib: &MemoryLibrary) -> LspContext {
    let text = lines.join("\n") + "\n";
    analyzer::analyze(OPENCODE,&text,lib,&Settings::new())
}

fn test_helper(lines: &[&str]) -> Vec<DocumentSymbolItem> {
    analyze(lines,&MemoryLibrary::new()).document_symbol(OPENCODE)
}

fn names(items: &[DocumentSymbolItem]) -> Vec<String> {
    items.iter().map(|i| i.name.clone()).collect()
}

fn find<'a>(items: &'a [DocumentSymbolItem],name: &str) -> &'a DocumentSymbolItem {
    match items.iter().find(|i| i.name==name) {
        Some(i) => i,
        None => panic!("{} not in outline {:?}",name,names(items))
    }
}

fn point(line: u32,col: u32) -> lsp::Range {
    lsp::Range::new(lsp::Position::new(line,col),lsp::Position::new(line,col))
}

mod sections {
    use super::DocumentSymbolKind;
    #[test]
    fn machine_symbol() {
        let outline = super::test_helper(&[
            "PROG     CSECT",
            "LBL      LR    1,2"
        ]);
        assert_eq!(super::names(&outline),vec!["PROG"]);
        assert_eq!(outline[0].kind,DocumentSymbolKind::Executable);
        assert_eq!(outline[0].range,super::point(0,0));
        assert_eq!(super::names(&outline[0].children),vec!["LBL"]);
        assert_eq!(outline[0].children[0].kind,DocumentSymbolKind::Mach);
        assert_eq!(outline[0].children[0].range,super::point(1,9));
    }
    #[test]
    fn absolute_symbols_at_root() {
        let outline = super::test_helper(&[
            "PROG     CSECT",
            "R1       EQU   1",
            "X        DS    F"
        ]);
        assert_eq!(super::names(&outline),vec!["R1","PROG"]);
        assert_eq!(outline[0].kind,DocumentSymbolKind::Equ);
        assert_eq!(outline[0].range,super::point(1,0));
        let prog = super::find(&outline,"PROG");
        assert_eq!(super::names(&prog.children),vec!["X"]);
        assert_eq!(prog.children[0].kind,DocumentSymbolKind::Dat);
    }
    #[test]
    fn two_sections() {
        let outline = super::test_helper(&[
            "A        CSECT",
            "LA1      LR    1,2",
            "B        DSECT",
            "FB       DS    F",
            "A        CSECT",
            "LA2      LR    1,2"
        ]);
        assert_eq!(super::names(&outline),vec!["A","B"]);
        let a = super::find(&outline,"A");
        let b = super::find(&outline,"B");
        assert_eq!(super::names(&a.children),vec!["LA1","LA2"]);
        assert_eq!(super::names(&b.children),vec!["FB"]);
        assert_eq!(b.kind,DocumentSymbolKind::Dummy);
    }
    #[test]
    fn short_labels() {
        let outline = super::test_helper(&[
            "",
            "C CSECT",
            "P LR 1,1",
            "E EQU 1"
        ]);
        let c = super::find(&outline,"C");
        assert_eq!(c.range,super::point(1,0));
        assert_eq!(super::names(&c.children),vec!["P"]);
        assert_eq!(c.children[0].range,super::point(2,2));
        assert_eq!(super::find(&outline,"E").range,super::point(3,0));
    }
    #[test]
    fn variables() {
        let outline = super::test_helper(&[
            "&A       SETA  1",
            "         LCLC  &B"
        ]);
        assert_eq!(super::names(&outline),vec!["A","B"]);
        assert!(outline.iter().all(|i| i.kind==DocumentSymbolKind::Var));
    }
}

mod macros {
    use super::DocumentSymbolKind;
    #[test]
    fn unused_macro() {
        let outline = super::test_helper(&[
            "         MACRO",
            "         UNUSED",
            "INMAC    DS    F",
            "         MEND",
            "PROG     CSECT"
        ]);
        assert_eq!(super::names(&outline),vec!["PROG"]);
        assert!(outline[0].children.is_empty());
    }
    #[test]
    fn macro_call() {
        let outline = super::test_helper(&[
            "         MACRO",
            "         GEN",
            "GENLBL   DS    F",
            "         MEND",
            "PROG     CSECT",
            "         GEN"
        ]);
        assert_eq!(super::names(&outline),vec!["PROG"]);
        let gen = super::find(&outline[0].children,"GEN");
        assert_eq!(gen.kind,DocumentSymbolKind::Macro);
        assert_eq!(super::names(&gen.children),vec!["GENLBL"]);
        assert_eq!(gen.range,super::point(5,9));
        assert_eq!(gen.children[0].range,super::point(5,9));
    }
    #[test]
    fn node_at_call_site() {
        let outline = super::test_helper(&[
            "",
            "    MACRO",
            "    M",
            "E   EQU 1",
            "    MEND",
            "    M"
        ]);
        assert_eq!(super::names(&outline),vec!["M"]);
        assert_eq!(outline[0].kind,DocumentSymbolKind::Macro);
        assert_eq!(outline[0].range,super::point(5,4));
        assert_eq!(super::names(&outline[0].children),vec!["E"]);
        assert_eq!(outline[0].children[0].range,super::point(5,4));
    }
    #[test]
    fn nested_nodes_at_call_site() {
        let outline = super::test_helper(&[
            "",
            "    MACRO",
            "    M1",
            "P1  LR  1,1",
            "    MEND",
            "",
            "    MACRO",
            "    M2",
            "P2  LR  1,1",
            "    M1",
            "    MEND",
            "",
            "    M2"
        ]);
        assert_eq!(super::names(&outline),vec!["M2"]);
        let m2 = &outline[0];
        assert_eq!(m2.range,super::point(12,4));
        assert_eq!(super::names(&m2.children),vec!["P2","M1"]);
        let m1 = super::find(&m2.children,"M1");
        assert_eq!(m1.kind,DocumentSymbolKind::Macro);
        assert_eq!(m1.range,super::point(12,4));
        assert_eq!(super::find(&m2.children,"P2").range,super::point(12,4));
        assert_eq!(super::find(&m1.children,"P1").range,super::point(12,4));
    }
    #[test]
    fn section_opened_by_macro() {
        let outline = super::test_helper(&[
            "",
            "    MACRO",
            "    M1",
            "P1  LR  1,1",
            "    MEND",
            "",
            "    MACRO",
            "    M2",
            "P2  LR  1,1",
            "C2  CSECT",
            "    M1",
            "P3  LR  1,1",
            "    MEND",
            "",
            "C1  CSECT",
            "P4  LR 1,1",
            "    M2"
        ]);
        assert_eq!(super::names(&outline),vec!["C1","M2"]);
        let c1 = super::find(&outline,"C1");
        assert_eq!(c1.range,super::point(14,0));
        assert_eq!(super::names(&c1.children),vec!["P4","M2"]);
        let c1_m2 = super::find(&c1.children,"M2");
        assert_eq!(c1_m2.range,super::point(16,4));
        assert_eq!(super::names(&c1_m2.children),vec!["P2"]);
        let m2 = super::find(&outline,"M2");
        assert_eq!(m2.range,super::point(16,4));
        let c2 = super::find(&m2.children,"C2");
        assert_eq!(c2.range,super::point(16,4));
        assert_eq!(super::names(&c2.children),vec!["M1","P3"]);
        assert_eq!(super::find(&c2.children,"M1").range,super::point(16,4));
    }
    #[test]
    fn nested_calls() {
        let outline = super::test_helper(&[
            "         MACRO",
            "         INNER",
            "INSYM    EQU   1",
            "         MEND",
            "         MACRO",
            "         OUTER",
            "         INNER",
            "OUTSYM   EQU   2",
            "         MEND",
            "         OUTER"
        ]);
        assert_eq!(super::names(&outline),vec!["OUTER"]);
        let outer = &outline[0];
        assert_eq!(super::names(&outer.children),vec!["INNER","OUTSYM"]);
        let inner = super::find(&outer.children,"INNER");
        assert_eq!(inner.kind,DocumentSymbolKind::Macro);
        assert_eq!(super::names(&inner.children),vec!["INSYM"]);
    }
    #[test]
    fn calls_in_sections() {
        let outline = super::test_helper(&[
            "         MACRO",
            "         GEN   &L",
            "&L       DS    F",
            "         MEND",
            "A        CSECT",
            "         GEN   X1",
            "B        CSECT",
            "         GEN   X2"
        ]);
        assert_eq!(super::names(&outline),vec!["A","B"]);
        let a_gen = super::find(&super::find(&outline,"A").children,"GEN");
        let b_gen = super::find(&super::find(&outline,"B").children,"GEN");
        assert_eq!(super::names(&a_gen.children),vec!["X1"]);
        assert_eq!(super::names(&b_gen.children),vec!["X2"]);
    }
}

mod members {
    use super::{DocumentSymbolKind,MemoryLibrary};
    const DOC: &str = "*  doc\n         MACRO\n&LBL     LIBMAC &X,&K=1\n         LCLA  &I\n.TOP     ANOP\n         MEND\n";
    #[test]
    fn copy_node() {
        let mut lib = MemoryLibrary::new();
        lib.add("REGS","file:///maclib/REGS.hlasm","R1       EQU   1\n");
        let index = super::analyze(&["         COPY  REGS"],&lib);
        let outline = index.document_symbol(super::OPENCODE);
        assert_eq!(super::names(&outline),vec!["REGS"]);
        assert_eq!(outline[0].kind,DocumentSymbolKind::Copy);
        assert_eq!(super::names(&outline[0].children),vec!["R1"]);
    }
    #[test]
    fn copy_file() {
        let mut lib = MemoryLibrary::new();
        lib.add("CPYVARS","file:///maclib/CPYVARS.hlasm","&CV      SETA  1\n.CL      ANOP\n");
        let index = super::analyze(&["         COPY  CPYVARS"],&lib);
        let outline = index.document_symbol("file:///maclib/CPYVARS.hlasm");
        assert_eq!(super::names(&outline),vec!["CV","CL"]);
        assert_eq!(outline[0].kind,DocumentSymbolKind::Var);
        assert_eq!(outline[1].kind,DocumentSymbolKind::Seq);
    }
    #[test]
    fn macro_file() {
        let mut lib = MemoryLibrary::new();
        lib.add("LIBMAC","file:///maclib/LIBMAC.hlasm",DOC);
        let index = super::analyze(&["         LIBMAC 1"],&lib);
        let outline = index.document_symbol("file:///maclib/LIBMAC.hlasm");
        assert_eq!(super::names(&outline),vec!["LBL","X","K","I","TOP"]);
        assert_eq!(outline[4].kind,DocumentSymbolKind::Seq);
        assert_eq!(outline[4].range,super::point(4,0));
        assert_eq!(outline[3].range,super::point(3,15));
    }
    #[test]
    fn native_json() {
        let outline = super::test_helper(&[
            "PROG     CSECT",
            "LBL      LR    1,2"
        ]);
        let json = serde_json::to_value(&outline).expect("serialize failed");
        assert_eq!(json[0]["name"],"PROG");
        assert_eq!(json[0]["kind"],"EXECUTABLE");
        assert_eq!(json[0]["range"]["start"]["line"],0);
        assert_eq!(json[0]["children"][0]["kind"],"MACH");
        assert!(json[0]["children"][0].get("children").is_none());
    }
    #[test]
    fn unknown_file() {
        let index = super::analyze(&["         LR    1,2"],&MemoryLibrary::new());
        assert!(index.document_symbol("file:///nowhere.hlasm").is_empty());
    }
}
