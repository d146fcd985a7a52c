//! GraphQL document construction and rendering.
//!
//! A small selection tree with aliases, variable-bound arguments and inline
//! fragments. Every argument value is passed as a declared variable; caller
//! strings are never spliced into the document text.

use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::normalize::camel_to_snake;

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    InlineFragment {
        type_condition: String,
        selections: Vec<Selection>,
    },
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

/// A field with optional alias, arguments and sub-selections.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    /// `(argument name, variable name)` pairs.
    pub arguments: Vec<(String, String)>,
    pub selections: Vec<Selection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Bind argument `name` to variable `$variable`.
    pub fn arg(mut self, name: impl Into<String>, variable: impl Into<String>) -> Self {
        self.arguments.push((name.into(), variable.into()));
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selections.push(selection.into());
        self
    }

    pub fn select_all(mut self, selections: impl IntoIterator<Item = Selection>) -> Self {
        self.selections.extend(selections);
        self
    }

    /// Add scalar leaf fields.
    pub fn scalars<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.selections
            .extend(names.into_iter().map(|n| Selection::Field(Field::new(n))));
        self
    }

    /// Add an inline fragment on `type_condition`.
    pub fn on(mut self, type_condition: impl Into<String>, selections: Vec<Selection>) -> Self {
        if !selections.is_empty() {
            self.selections.push(Selection::InlineFragment {
                type_condition: type_condition.into(),
                selections,
            });
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct VariableDefinition {
    name: String,
    graphql_type: &'static str,
}

/// A query operation under construction.
#[derive(Debug, Clone)]
pub struct QueryDocument {
    operation_name: &'static str,
    definitions: Vec<VariableDefinition>,
    values: Map<String, Value>,
    root: Vec<Selection>,
}

impl QueryDocument {
    pub fn new(operation_name: &'static str) -> Self {
        Self {
            operation_name,
            definitions: Vec::new(),
            values: Map::new(),
            root: Vec::new(),
        }
    }

    /// Declare `$name: graphql_type` and bind its value.
    pub fn variable(
        &mut self,
        name: impl Into<String>,
        graphql_type: &'static str,
        value: Value,
    ) -> &mut Self {
        let name = name.into();
        self.definitions.push(VariableDefinition {
            name: name.clone(),
            graphql_type,
        });
        self.values.insert(name, value);
        self
    }

    pub fn select(&mut self, field: Field) -> &mut Self {
        self.root.push(Selection::Field(field));
        self
    }

    /// Render the document text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "query {}", self.operation_name);
        if !self.definitions.is_empty() {
            let defs = self
                .definitions
                .iter()
                .map(|d| format!("${}: {}", d.name, d.graphql_type))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(out, "({defs})");
        }
        out.push_str(" {\n");
        render_selections(&mut out, &self.root, 1);
        out.push('}');
        out
    }

    /// Finish the document; `result_path` is given in wire (camelCase) names.
    pub fn build(self, result_path: &[&str]) -> BuiltQuery {
        BuiltQuery {
            operation_name: self.operation_name,
            document: self.render(),
            variables: Value::Object(self.values),
            result_path: result_path.iter().map(|s| camel_to_snake(s)).collect(),
        }
    }
}

fn render_selections(out: &mut String, selections: &[Selection], depth: usize) {
    let indent = "  ".repeat(depth);
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                out.push_str(&indent);
                if let Some(alias) = &field.alias {
                    let _ = write!(out, "{alias}: ");
                }
                out.push_str(&field.name);
                if !field.arguments.is_empty() {
                    let args = field
                        .arguments
                        .iter()
                        .map(|(arg, var)| format!("{arg}: ${var}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let _ = write!(out, "({args})");
                }
                if field.selections.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(" {\n");
                    render_selections(out, &field.selections, depth + 1);
                    out.push_str(&indent);
                    out.push_str("}\n");
                }
            }
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                let _ = writeln!(out, "{indent}... on {type_condition} {{");
                render_selections(out, selections, depth + 1);
                out.push_str(&indent);
                out.push_str("}\n");
            }
        }
    }
}

/// An executable query plus the location of its result.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub operation_name: &'static str,
    pub document: String,
    pub variables: Value,
    /// Path to the result sub-node, in normalized (snake_case) names.
    pub result_path: Vec<String>,
}

impl BuiltQuery {
    /// Result path as string slices.
    pub fn path(&self) -> Vec<&str> {
        self.result_path.iter().map(String::as_str).collect()
    }

    /// Dotted form of the result path, for logs and errors.
    pub fn dotted_path(&self) -> String {
        self.result_path.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_nested_document() {
        let mut doc = QueryDocument::new("Example");
        doc.variable("environmentId", "BigInt!", json!(7));
        doc.select(
            Field::new("environment").arg("id", "environmentId").select(
                Field::new("applied")
                    .select(Field::new("modelHistoricalRuns").alias("model_0").scalars(["name"])),
            ),
        );

        let expected = "query Example($environmentId: BigInt!) {\n  environment(id: $environmentId) {\n    applied {\n      model_0: modelHistoricalRuns {\n        name\n      }\n    }\n  }\n}";
        assert_eq!(doc.render(), expected);
    }

    #[test]
    fn test_render_inline_fragment() {
        let mut doc = QueryDocument::new("Frag");
        doc.select(Field::new("node").scalars(["name"]).on(
            "ModelDefinitionNode",
            vec![Field::new("rawCode").into()],
        ));
        let rendered = doc.render();
        assert!(rendered.contains("... on ModelDefinitionNode {\n      rawCode\n    }"));
    }

    #[test]
    fn test_empty_fragment_is_dropped() {
        let field = Field::new("node").on("X", Vec::new());
        assert!(field.selections.is_empty());
    }

    #[test]
    fn test_build_normalizes_result_path() {
        let mut doc = QueryDocument::new("Q");
        doc.select(Field::new("job").scalars(["id"]));
        let built = doc.build(&["job", "modelHistoricalRuns"]);
        assert_eq!(built.result_path, vec!["job", "model_historical_runs"]);
        assert_eq!(built.variables, json!({}));
        assert!(built.document.starts_with("query Q {"));
    }
}
