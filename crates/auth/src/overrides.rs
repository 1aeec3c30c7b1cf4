//! Exceptional role/position/location combinations that bypass normal
//! permission resolution.
//!
//! Rules are data: an ordered, versioned table of predicates evaluated by one
//! generic engine. New exceptions are table edits, not code changes. The first
//! matching rule is authoritative, whatever later rules would say.

use serde::{Deserialize, Serialize};

use crate::text::{non_blank, normalize};
use crate::{EmployeeProfile, ModulePermissions, RoleName};

/// Predicate over the normalized `(role, position, location, business_unit)`
/// of a profile.
///
/// String operands are normalized before comparison. `all` and `any` over an
/// empty list never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    /// Role name equals one of the listed names.
    RoleIs(Vec<String>),
    /// Position title contains the given text.
    PositionContains(String),
    LocationIs(String),
    BusinessUnitIs(String),
}

impl Predicate {
    pub fn matches(&self, subject: &RuleSubject) -> bool {
        match self {
            Predicate::All(items) => !items.is_empty() && items.iter().all(|p| p.matches(subject)),
            Predicate::Any(items) => items.iter().any(|p| p.matches(subject)),
            Predicate::RoleIs(names) => subject
                .role
                .as_deref()
                .is_some_and(|role| names.iter().any(|n| normalize(n) == role)),
            Predicate::PositionContains(text) => {
                let needle = normalize(text);
                !needle.is_empty() && subject.position.as_deref().is_some_and(|p| p.contains(&needle))
            }
            Predicate::LocationIs(location) => equals(subject.location.as_deref(), location),
            Predicate::BusinessUnitIs(unit) => equals(subject.business_unit.as_deref(), unit),
        }
    }
}

fn equals(field: Option<&str>, expected: &str) -> bool {
    field.is_some_and(|value| value == normalize(expected))
}

/// Normalized view of a profile for rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSubject {
    pub role: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub business_unit: Option<String>,
}

impl RuleSubject {
    pub fn new(profile: &EmployeeProfile, role: Option<&RoleName>) -> Self {
        Self {
            role: role.filter(|r| !r.is_empty()).map(|r| r.as_str().to_string()),
            position: non_blank(Some(&profile.position)),
            location: non_blank(Some(&profile.location)),
            business_unit: non_blank(Some(&profile.business_unit)),
        }
    }
}

/// One exception: a predicate and the full grant it confers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRule {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub when: Predicate,
}

/// Ordered, versioned exception table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRuleSet {
    pub version: u32,
    pub rules: Vec<ExceptionRule>,
}

impl Default for ExceptionRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExceptionRuleSet {
    /// Exceptions the HR application ships with.
    pub fn builtin() -> Self {
        Self {
            version: 1,
            rules: vec![
                ExceptionRule {
                    id: "system-administrators".to_string(),
                    description: Some("Platform administrators".to_string()),
                    when: Predicate::RoleIs(vec!["ADMIN".to_string(), "SUPER ADMIN".to_string()]),
                },
                ExceptionRule {
                    id: "people-analyst-central-admin".to_string(),
                    description: Some(
                        "People & management analyst at central administration".to_string(),
                    ),
                    when: Predicate::All(vec![
                        Predicate::RoleIs(vec!["ANALISTA DE GENTE Y GESTION".to_string()]),
                        Predicate::LocationIs("ADM. CENTRAL".to_string()),
                        Predicate::BusinessUnitIs("ADMINISTRACION".to_string()),
                    ]),
                },
                ExceptionRule {
                    id: "head-of-people".to_string(),
                    description: Some("Head of people & management".to_string()),
                    when: Predicate::Any(vec![
                        Predicate::RoleIs(vec!["JEFE DE GENTE Y GESTION".to_string()]),
                        Predicate::PositionContains("JEFE DE GENTE".to_string()),
                    ]),
                },
            ],
        }
    }
}

/// Grant conferred by a matching exception rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideMatch {
    pub rule_id: String,
    pub rule_set_version: u32,
}

impl OverrideMatch {
    /// Every module fully granted through the wildcard entry.
    pub fn permissions(&self) -> ModulePermissions {
        ModulePermissions::full()
    }
}

/// Evaluates an [`ExceptionRuleSet`] in order, stopping at the first match.
#[derive(Debug, Clone, Default)]
pub struct ExceptionOverrideEngine {
    rules: ExceptionRuleSet,
}

impl ExceptionOverrideEngine {
    pub fn new(rules: ExceptionRuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ExceptionRuleSet {
        &self.rules
    }

    pub fn resolve(&self, profile: &EmployeeProfile, role: Option<&RoleName>) -> Option<OverrideMatch> {
        self.resolve_subject(&RuleSubject::new(profile, role))
    }

    pub fn resolve_subject(&self, subject: &RuleSubject) -> Option<OverrideMatch> {
        let rule = self.rules.rules.iter().find(|rule| rule.when.matches(subject))?;
        tracing::debug!(rule = %rule.id, version = self.rules.version, "exception rule matched");
        Some(OverrideMatch {
            rule_id: rule.id.clone(),
            rule_set_version: self.rules.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrgate_core::EmployeeId;

    fn profile(position: &str, location: &str, unit: &str) -> EmployeeProfile {
        EmployeeProfile {
            id: EmployeeId::new(),
            full_name: "Test".to_string(),
            email: "test@corp.pe".to_string(),
            position: position.to_string(),
            location: location.to_string(),
            business_unit: unit.to_string(),
            role_id: None,
            is_active: true,
        }
    }

    #[test]
    fn analyst_needs_all_three_conditions() {
        let engine = ExceptionOverrideEngine::default();
        let role = RoleName::new("Analista de Gente y Gestión");

        let central = profile("Analista", "Adm. Central", "Administración");
        let hit = engine.resolve(&central, Some(&role)).unwrap();
        assert_eq!(hit.rule_id, "people-analyst-central-admin");

        let branch = profile("Analista", "Trujillo", "Administración");
        assert_eq!(engine.resolve(&branch, Some(&role)), None);
    }

    #[test]
    fn head_of_people_matches_by_role_or_position() {
        let engine = ExceptionOverrideEngine::default();

        let by_role = profile("Gerente", "Lima", "Corporativo");
        let role = RoleName::new("JEFE DE GENTE Y GESTION");
        assert_eq!(engine.resolve(&by_role, Some(&role)).unwrap().rule_id, "head-of-people");

        let by_position = profile("Jefe de Gente y Gestión", "Lima", "Corporativo");
        assert_eq!(engine.resolve(&by_position, None).unwrap().rule_id, "head-of-people");
    }

    #[test]
    fn admin_roles_match_first_rule() {
        let engine = ExceptionOverrideEngine::default();
        let p = profile("", "", "");
        for name in ["admin", "Super Admin"] {
            let role = RoleName::new(name);
            assert_eq!(engine.resolve(&p, Some(&role)).unwrap().rule_id, "system-administrators");
        }
    }

    #[test]
    fn plain_employee_gets_no_override() {
        let engine = ExceptionOverrideEngine::default();
        let role = RoleName::new("COLABORADOR");
        assert_eq!(engine.resolve(&profile("Operario", "Piura", "Operaciones"), Some(&role)), None);
    }

    #[test]
    fn first_listed_rule_is_authoritative() {
        let first = ExceptionRule {
            id: "by-location".to_string(),
            description: None,
            when: Predicate::LocationIs("Lima".to_string()),
        };
        let second = ExceptionRule {
            id: "by-unit".to_string(),
            description: None,
            when: Predicate::BusinessUnitIs("Finanzas".to_string()),
        };
        let p = profile("Contador", "Lima", "Finanzas");

        let both = ExceptionOverrideEngine::new(ExceptionRuleSet {
            version: 7,
            rules: vec![first.clone(), second.clone()],
        });
        let only_first = ExceptionOverrideEngine::new(ExceptionRuleSet {
            version: 7,
            rules: vec![first],
        });
        assert_eq!(both.resolve(&p, None), only_first.resolve(&p, None));

        let reversed = ExceptionOverrideEngine::new(ExceptionRuleSet {
            version: 7,
            rules: vec![second, both.rules().rules[0].clone()],
        });
        assert_eq!(reversed.resolve(&p, None).unwrap().rule_id, "by-unit");
    }

    #[test]
    fn empty_combinators_never_match() {
        let subject = RuleSubject::new(&profile("x", "y", "z"), None);
        assert!(!Predicate::All(Vec::new()).matches(&subject));
        assert!(!Predicate::Any(Vec::new()).matches(&subject));
        assert!(!Predicate::PositionContains("  ".to_string()).matches(&subject));
    }

    #[test]
    fn blank_profile_fields_never_equal_blank_operands() {
        let subject = RuleSubject::new(&profile("", "", ""), None);
        assert!(!Predicate::LocationIs(String::new()).matches(&subject));
        assert!(!Predicate::RoleIs(vec![String::new()]).matches(&subject));
    }

    #[test]
    fn rule_set_loads_from_json() {
        let json = r#"{
            "version": 3,
            "rules": [
                { "id": "auditor", "when": { "all": [
                    { "role_is": ["Auditor Interno"] },
                    { "business_unit_is": "Auditoría" }
                ] } }
            ]
        }"#;
        let rules: ExceptionRuleSet = serde_json::from_str(json).unwrap();
        let engine = ExceptionOverrideEngine::new(rules);
        let role = RoleName::new("AUDITOR INTERNO");

        let hit = engine.resolve(&profile("Auditor", "Lima", "AUDITORIA"), Some(&role)).unwrap();
        assert_eq!(hit.rule_id, "auditor");
        assert_eq!(hit.rule_set_version, 3);
        assert!(hit.permissions().allows(&crate::ModuleKey::USERS, crate::Action::Delete));
    }
}
