//! The standard repository-mining schema
//!
//! Record and enumeration descriptors for the data a program runs over:
//! projects, their repositories, revisions and changed files, and the
//! source-level AST of each file.

use crate::registry::{ProtoEnum, ProtoTuple, TypeRegistry};
use crate::types::Type;

fn record(name: &str) -> Type {
    Type::Record(name.to_string())
}

fn enumeration(name: &str) -> Type {
    Type::Enum(name.to_string())
}

fn list(element: Type) -> Type {
    Type::proto_list(element)
}

pub(crate) fn standard_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();

    for e in enums() {
        registry.add_enum(e);
    }
    for r in records() {
        registry.add_record(r);
    }

    registry
}

fn enums() -> Vec<ProtoEnum> {
    vec![
        ProtoEnum::new("RepositoryKind", &["OTHER", "SVN", "CVS", "GIT", "HG", "BZR"]),
        ProtoEnum::new(
            "ChangeKind",
            &["UNKNOWN", "ADDED", "DELETED", "MODIFIED", "RENAMED", "COPIED", "MERGED", "UNMAPPED"],
        ),
        ProtoEnum::new(
            "FileKind",
            &[
                "OTHER",
                "BINARY",
                "TEXT",
                "XML",
                "SOURCE_JAVA_ERROR",
                "SOURCE_JAVA_JLS2",
                "SOURCE_JAVA_JLS3",
                "SOURCE_JAVA_JLS4",
            ],
        ),
        ProtoEnum::new(
            "TypeKind",
            &["OTHER", "CLASS", "INTERFACE", "ANONYMOUS", "ENUM", "ANNOTATION", "GENERIC", "PRIMITIVE", "ARRAY"],
        ),
        ProtoEnum::new(
            "StatementKind",
            &[
                "OTHER", "BLOCK", "TYPEDECL", "EXPRESSION", "SYNCHRONIZED", "RETURN", "FOR", "DO",
                "WHILE", "IF", "ASSERT", "BREAK", "CONTINUE", "LABEL", "SWITCH", "CASE", "TRY",
                "THROW", "CATCH", "EMPTY",
            ],
        ),
        ProtoEnum::new(
            "ExpressionKind",
            &[
                "OTHER", "LITERAL", "VARACCESS", "VARDECL", "METHODCALL", "CAST", "ARRAYINDEX",
                "ARRAYINIT", "TYPECOMPARE", "NEW", "NEWARRAY", "OP_ADD", "OP_SUB", "OP_MULT",
                "OP_DIV", "OP_MOD", "OP_INC", "OP_DEC", "LOGICAL_NOT", "LOGICAL_AND",
                "LOGICAL_OR", "EQ", "NEQ", "LT", "LTEQ", "GT", "GTEQ", "CONDITIONAL", "NULLCOALESCE",
                "ASSIGN",
            ],
        ),
        ProtoEnum::new(
            "ModifierKind",
            &["OTHER", "VISIBILITY", "ANNOTATION", "FINAL", "STATIC", "SYNCHRONIZED", "ABSTRACT"],
        ),
        ProtoEnum::new("Visibility", &["PUBLIC", "PRIVATE", "PROTECTED", "NAMESPACE"]),
    ]
}

fn records() -> Vec<ProtoTuple> {
    vec![
        ProtoTuple::new("Project")
            .field(0, "id", Type::String)
            .field(1, "name", Type::String)
            .field(2, "project_url", Type::String)
            .field(3, "homepage_url", Type::String)
            .field(4, "created_date", Type::Time)
            .field(5, "description", Type::String)
            .field(6, "operating_systems", list(Type::String))
            .field(7, "programming_languages", list(Type::String))
            .field(8, "databases", list(Type::String))
            .field(9, "licenses", list(Type::String))
            .field(10, "topics", list(Type::String))
            .field(11, "maintainers", list(record("Person")))
            .field(12, "developers", list(record("Person")))
            .field(13, "code_repositories", list(record("CodeRepository"))),
        ProtoTuple::new("CodeRepository")
            .field(0, "url", Type::String)
            .field(1, "kind", enumeration("RepositoryKind"))
            .field(2, "revisions", list(record("Revision"))),
        ProtoTuple::new("Revision")
            .field(0, "id", Type::String)
            .field(1, "author", record("Person"))
            .field(2, "committer", record("Person"))
            .field(3, "commit_date", Type::Time)
            .field(4, "log", Type::String)
            .field(5, "files", list(record("ChangedFile"))),
        ProtoTuple::new("ChangedFile")
            .field(0, "name", Type::String)
            .field(1, "kind", enumeration("FileKind"))
            .field(2, "change", enumeration("ChangeKind")),
        ProtoTuple::new("Person")
            .field(0, "username", Type::String)
            .field(1, "real_name", Type::String)
            .field(2, "email", Type::String),
        ProtoTuple::new("ASTRoot")
            .field(0, "namespaces", list(record("Namespace")))
            .field(1, "imports", list(Type::String)),
        ProtoTuple::new("Namespace")
            .field(0, "name", Type::String)
            .field(1, "modifiers", list(record("Modifier")))
            .field(2, "declarations", list(record("Declaration"))),
        ProtoTuple::new("Declaration")
            .field(0, "name", Type::String)
            .field(1, "kind", enumeration("TypeKind"))
            .field(2, "modifiers", list(record("Modifier")))
            .field(3, "generic_parameters", list(record("Type")))
            .field(4, "parents", list(record("Type")))
            .field(5, "methods", list(record("Method")))
            .field(6, "fields", list(record("Variable")))
            .field(7, "nested_declarations", list(record("Declaration"))),
        // message index 2 is reserved in the wire format
        ProtoTuple::new("Type")
            .field(0, "name", Type::String)
            .field(1, "kind", enumeration("TypeKind"))
            .field(3, "id", Type::String),
        ProtoTuple::new("Method")
            .field(0, "name", Type::String)
            .field(1, "modifiers", list(record("Modifier")))
            .field(2, "return_type", record("Type"))
            .field(3, "generic_parameters", list(record("Type")))
            .field(4, "arguments", list(record("Variable")))
            .field(5, "exception_types", list(record("Type")))
            .field(6, "statements", list(record("Statement"))),
        ProtoTuple::new("Variable")
            .field(0, "name", Type::String)
            .field(1, "variable_type", record("Type"))
            .field(2, "modifiers", list(record("Modifier")))
            .field(3, "initializer", record("Expression")),
        ProtoTuple::new("Statement")
            .field(0, "kind", enumeration("StatementKind"))
            .field(1, "statements", list(record("Statement")))
            .field(2, "initializations", list(record("Expression")))
            .field(3, "condition", record("Expression"))
            .field(4, "updates", list(record("Expression")))
            .field(5, "variable_declaration", record("Variable"))
            .field(6, "type_declaration", record("Declaration"))
            .field(7, "expression", record("Expression")),
        ProtoTuple::new("Expression")
            .field(0, "kind", enumeration("ExpressionKind"))
            .field(1, "expressions", list(record("Expression")))
            .field(2, "variable_decls", list(record("Variable")))
            .field(3, "new_type", record("Type"))
            .field(4, "generic_parameters", list(record("Type")))
            .field(5, "is_postfix", Type::Bool)
            .field(6, "literal", Type::String)
            .field(7, "variable", Type::String)
            .field(8, "method", Type::String)
            .field(9, "method_args", list(record("Expression")))
            .field(10, "anon_declaration", record("Declaration")),
        ProtoTuple::new("Modifier")
            .field(0, "kind", enumeration("ModifierKind"))
            .field(1, "visibility", enumeration("Visibility"))
            .field(2, "annotation_name", Type::String)
            .field(3, "annotation_members", list(Type::String))
            .field(4, "annotation_values", list(record("Expression")))
            .field(5, "other", Type::String),
        // a trained classifier, opaque to programs
        ProtoTuple::new("Model"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_referenced_type_is_registered() {
        let registry = standard_registry();
        fn referenced(ty: &Type, out: &mut Vec<String>) {
            match ty {
                Type::Record(name) | Type::Enum(name) => out.push(name.clone()),
                Type::ProtoList(inner) => referenced(inner, out),
                _ => {}
            }
        }

        for name in registry.type_names() {
            if let Some(record) = registry.record(name) {
                let mut names = Vec::new();
                for (_, attr) in record.attributes() {
                    referenced(&attr.ty, &mut names);
                }
                for n in names {
                    assert!(registry.has_type(&n), "{} references unknown type {}", name, n);
                }
            }
        }
    }

    #[test]
    fn test_model_is_opaque() {
        let registry = standard_registry();
        assert_eq!(registry.lookup("Model"), Some(&record("Model")));
        assert!(registry.record("Model").unwrap().attributes().is_empty());
    }

    #[test]
    fn test_type_record_keeps_sparse_indices() {
        let registry = standard_registry();
        let ty = registry.record("Type").unwrap();
        let indices: Vec<_> = ty.attributes().iter().map(|(_, a)| a.index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
    }
}
