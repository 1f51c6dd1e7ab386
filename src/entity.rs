//! Entity resolution: schema-first with heuristic fallback.
//!
//! When a schema file is present its declared models are authoritative
//! (confidence 0.9). Without one, component state typed `Identifier[]`
//! seeds candidate entities from a common-field table. Heuristic
//! entities whose name already exists in the schema set are dropped;
//! the rest are appended at an intermediate confidence.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::facts::ComponentFact;
use crate::ir::{Cardinality, Entity, EntityField, FieldType, Provenance, Relation};
use crate::scan::balanced_inner;

/// Fixed schema-file location relative to the project root.
pub const SCHEMA_PATH: &str = "prisma/schema.prisma";

const SCHEMA_CONFIDENCE: f64 = 0.9;
const HEURISTIC_BASE: f64 = 0.3;
const HEURISTIC_PER_FIELD: f64 = 0.05;
const HEURISTIC_CAP: f64 = 0.55;
const COMBINED_CONFIDENCE: f64 = 0.65;

lazy_static! {
    static ref MODEL_RE: Regex = Regex::new(r"model\s+([A-Za-z_][\w]*)\s*\{").unwrap();
    static ref ARRAY_STATE_RE: Regex = Regex::new(r"^([A-Z][A-Za-z0-9_]*)\[\]$").unwrap();
    static ref DEFAULT_ATTR_RE: Regex = Regex::new(r"@default\s*\(([^)]*)\)").unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct EntityResolution {
    pub entities: Vec<Entity>,
    /// Schema parse problems; non-fatal, the heuristic path still ran.
    pub errors: Vec<String>,
}

/// Resolves the canonical entity list for one run.
pub fn resolve_entities(
    schema_source: Option<&str>,
    components: &[ComponentFact],
) -> EntityResolution {
    let mut resolution = EntityResolution::default();
    let mut schema_entities: Vec<Entity> = Vec::new();

    if let Some(source) = schema_source {
        match parse_schema(source) {
            Ok(entities) => schema_entities = entities,
            Err(message) => resolution.errors.push(message),
        }
    }

    let had_schema = !schema_entities.is_empty();
    let mut by_name: BTreeMap<String, Entity> = BTreeMap::new();
    for entity in schema_entities {
        by_name.insert(entity.name.clone(), entity);
    }

    for mut candidate in heuristic_entities(components) {
        if by_name.contains_key(&candidate.name) {
            continue;
        }
        if had_schema {
            candidate.confidence = COMBINED_CONFIDENCE;
        }
        by_name.insert(candidate.name.clone(), candidate);
    }

    resolution.entities = by_name.into_values().collect();
    resolution
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses schema model blocks into entities. Declared scalar types map
/// through a fixed table; capitalized non-scalar types become relations
/// with cardinality many iff declared as a list.
pub fn parse_schema(source: &str) -> Result<Vec<Entity>, String> {
    let mut entities = Vec::new();

    for caps in MODEL_RE.captures_iter(source) {
        let name = caps[1].to_string();
        let open = caps.get(0).unwrap().end() - 1;
        let body = balanced_inner(source, open, '{', '}')
            .ok_or_else(|| format!("unbalanced model block for {name}"))?;

        let mut fields = Vec::new();
        let mut relations = Vec::new();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") || line.starts_with("@@") {
                continue;
            }
            let mut words = line.split_whitespace();
            let (Some(field_name), Some(type_word)) = (words.next(), words.next()) else {
                continue;
            };

            let is_list = type_word.ends_with("[]");
            let is_optional = type_word.ends_with('?');
            let base_type = type_word.trim_end_matches("[]").trim_end_matches('?');

            if is_relation_type(base_type) {
                relations.push(Relation {
                    name: field_name.to_string(),
                    target: base_type.to_string(),
                    cardinality: if is_list {
                        Cardinality::Many
                    } else {
                        Cardinality::One
                    },
                });
                continue;
            }

            let default = DEFAULT_ATTR_RE
                .captures(line)
                .map(|c| c[1].trim().to_string());
            fields.push(EntityField {
                name: field_name.to_string(),
                field_type: map_scalar(base_type),
                required: !is_optional,
                default,
            });
        }

        if fields.is_empty() && relations.is_empty() {
            return Err(format!("model {name} declares no fields"));
        }
        entities.push(Entity {
            name,
            fields,
            relations,
            provenance: Provenance::Schema,
            confidence: SCHEMA_CONFIDENCE,
        });
    }

    Ok(entities)
}

/// Fixed scalar mapping; unrecognized declared types fall back to text.
pub fn map_scalar(declared: &str) -> FieldType {
    match declared {
        "String" => FieldType::Text,
        "Boolean" => FieldType::Boolean,
        "Int" | "BigInt" | "Float" | "Decimal" => FieldType::Number,
        "DateTime" => FieldType::Date,
        "Json" | "Bytes" => FieldType::Object,
        _ => FieldType::Text,
    }
}

fn is_relation_type(base_type: &str) -> bool {
    const SCALARS: [&str; 9] = [
        "String", "Boolean", "Int", "BigInt", "Float", "Decimal", "DateTime", "Json", "Bytes",
    ];
    base_type
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && !SCALARS.contains(&base_type)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEURISTIC PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Candidate entities from component state typed `Identifier[]`. Fields
/// come from a common-field table gated by name keyword hints.
fn heuristic_entities(components: &[ComponentFact]) -> Vec<Entity> {
    let mut by_name: BTreeMap<String, Entity> = BTreeMap::new();

    for component in components {
        for state in &component.state {
            let Some(caps) = ARRAY_STATE_RE.captures(state.type_text.trim()) else {
                continue;
            };
            let name = caps[1].to_string();
            if by_name.contains_key(&name) {
                continue;
            }

            let fields = common_fields(&name, &component.file_path);
            let count = fields.len();
            let confidence =
                (HEURISTIC_BASE + HEURISTIC_PER_FIELD * count as f64).min(HEURISTIC_CAP);
            by_name.insert(
                name.clone(),
                Entity {
                    name,
                    fields,
                    relations: Vec::new(),
                    provenance: Provenance::Heuristic,
                    confidence,
                },
            );
        }
    }

    by_name.into_values().collect()
}

fn common_fields(entity_name: &str, file_path: &str) -> Vec<EntityField> {
    let hint = format!("{} {}", entity_name.to_lowercase(), file_path.to_lowercase());
    let mut fields = vec![EntityField::required("id", FieldType::Number)];

    if hint.contains("task") || hint.contains("todo") {
        fields.push(EntityField::required("title", FieldType::Text));
        fields.push(EntityField {
            name: "completed".to_string(),
            field_type: FieldType::Boolean,
            required: true,
            default: Some("false".to_string()),
        });
    } else if hint.contains("user") || hint.contains("member") || hint.contains("account") {
        fields.push(EntityField::required("name", FieldType::Text));
        fields.push(EntityField::required("email", FieldType::Text));
    } else {
        fields.push(EntityField::required("title", FieldType::Text));
    }

    fields
}
