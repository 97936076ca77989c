//! Built-in templates and parameters for every role.

use kiln_store::{DetailLevel, Elimination, Intensity, Role, RoleParameters};

/// Placeholders every role's template may use.
pub const COMMON_PLACEHOLDERS: &[&str] = &[
    "context",
    "task",
    "project_name",
    "description",
    "previous",
    "focus_areas",
    "considerations",
    "intensity",
    "elimination",
    "detail_level",
    "detail_instruction",
];

/// Placeholder names a role's template may reference.
///
/// A role may read the slots of every role that runs before it, plus the
/// common placeholders. Its own earlier output is available as `previous`.
pub fn recognized_placeholders(role: Role) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = COMMON_PLACEHOLDERS.to_vec();
    names.extend(
        Role::ALL
            .iter()
            .take_while(|r| **r != role)
            .map(|r| r.slot()),
    );
    names
}

const VISIONARY_TEMPLATE: &str = "You are the Visionary for a new software project.

Project context so far:
{context}

Task: {task}

Work from first principles:
1. What fundamental problem is this project solving?
2. What would the ideal solution look like without inherited constraints?
3. Which constraints are real and which are only assumed?
4. Where could the project be ten times better rather than ten percent better?

Focus areas:
{focus_areas}

Keep in mind:
{considerations}

Ambition: {intensity}. Constraint elimination: {elimination}.
{detail_instruction}

Your earlier notes on this project:
{previous}

Write the product vision.";

const STRATEGIST_TEMPLATE: &str = "You are the Technology Strategist for a new software project.

Project context so far:
{context}

Task: {task}

The Visionary's direction:
{vision}

Break the technical problem into its fundamental parts. Question which \
conventions actually serve the vision and which only limit it. Recommend the \
core technologies, the infrastructure shape, and a roadmap.

Focus areas:
{focus_areas}

Keep in mind:
{considerations}

Ambition: {intensity}. Constraint elimination: {elimination}.
{detail_instruction}

Your earlier decisions:
{previous}

Write the technical strategy.";

const DESIGNER_TEMPLATE: &str = "You are the Chief Designer for a new software project.

Project context so far:
{context}

Task: {task}

Vision:
{vision}

Technical strategy:
{tech_strategy}

Decompose the system into its essential components. Describe the components, \
their boundaries, the data flows between them, and how the design scales.

Focus areas:
{focus_areas}

Keep in mind:
{considerations}

Ambition: {intensity}. Constraint elimination: {elimination}.
{detail_instruction}

Your earlier designs:
{previous}

Write the architecture.";

const BUILDER_TEMPLATE: &str = "You are the Builder for a new software project.

Project context so far:
{context}

Task: {task}

Architecture:
{design}

Technical strategy:
{tech_strategy}

Plan the implementation: code organization, key algorithms, data models, \
milestones, and how the work should be sequenced.

Focus areas:
{focus_areas}

Keep in mind:
{considerations}

Ambition: {intensity}. Constraint elimination: {elimination}.
{detail_instruction}

Your earlier work:
{previous}

Write the implementation plan.";

const LAYOUT_TEMPLATE: &str = r#"You are the Layout Planner for a new software project.

Task: {task}

Vision:
{vision}

Technical strategy:
{tech_strategy}

Architecture:
{design}

Implementation plan:
{implementation}

Design the complete directory and file layout for this project.

Focus areas:
{focus_areas}

Keep in mind:
{considerations}

{detail_instruction}

Earlier layouts:
{previous}

Answer with a single JSON object inside a ```json fenced block, using exactly this shape:

```json
{
  "directories": {
    "src": {
      "description": "what the directory holds",
      "directories": {},
      "files": {
        "main.py": {
          "description": "what the file does",
          "type": "module",
          "content_template": "one-line summary of the intended content"
        }
      }
    }
  },
  "files": {
    "README.md": {
      "description": "project overview",
      "type": "documentation",
      "content_template": "overview and setup instructions"
    }
  }
}
```

Valid values for "type" are: module, configuration, documentation, test, build, other."#;

/// The built-in template text for `role`.
pub fn default_template(role: Role) -> &'static str {
    match role {
        Role::Visionary => VISIONARY_TEMPLATE,
        Role::Strategist => STRATEGIST_TEMPLATE,
        Role::Designer => DESIGNER_TEMPLATE,
        Role::Builder => BUILDER_TEMPLATE,
        Role::Layout => LAYOUT_TEMPLATE,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// The built-in parameters for `role`.
pub fn default_parameters(role: Role) -> RoleParameters {
    match role {
        Role::Visionary => RoleParameters {
            focus_areas: strings(&[
                "First-principles problem analysis",
                "Product vision",
                "Order-of-magnitude improvements",
                "Constraint elimination",
            ]),
            intensity: Intensity::Maximum,
            elimination: Elimination::Aggressive,
            detail_level: DetailLevel::Medium,
            considerations: strings(&["Who the users are", "What makes this worth building"]),
        },
        Role::Strategist => RoleParameters {
            focus_areas: strings(&[
                "Technical strategy",
                "Technology selection",
                "Infrastructure planning",
                "Technical roadmap",
            ]),
            intensity: Intensity::Maximum,
            elimination: Elimination::Aggressive,
            detail_level: DetailLevel::Medium,
            considerations: strings(&[
                "Real physical limits",
                "Feasibility",
                "Conventions worth challenging",
            ]),
        },
        Role::Designer => RoleParameters {
            focus_areas: strings(&[
                "Component design",
                "Scaling architecture",
                "Interaction patterns",
                "Resilience through simplicity",
            ]),
            intensity: Intensity::High,
            elimination: Elimination::Aggressive,
            detail_level: DetailLevel::Medium,
            considerations: strings(&["Simplification opportunities", "Failure modes"]),
        },
        Role::Builder => RoleParameters {
            focus_areas: strings(&[
                "Code organization",
                "Implementation patterns",
                "Iteration speed",
                "Testability",
            ]),
            intensity: Intensity::High,
            elimination: Elimination::Moderate,
            detail_level: DetailLevel::Medium,
            considerations: strings(&["Smallest useful first milestone", "Maintenance cost"]),
        },
        Role::Layout => RoleParameters {
            focus_areas: strings(&[
                "File organization",
                "Directory structure",
                "Intuitive relationships",
                "Technical debt prevention",
            ]),
            intensity: Intensity::Maximum,
            elimination: Elimination::Aggressive,
            detail_level: DetailLevel::High,
            considerations: strings(&[
                "Related files live together",
                "Tests mirror the source layout",
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::prompt::PromptTemplate;

    #[test]
    fn every_default_uses_task() {
        for role in Role::ALL {
            let t = PromptTemplate::parse(default_template(role));
            assert!(t.placeholders().contains(&"task"), "{role} template lacks {{task}}");
        }
    }

    #[test]
    fn defaults_only_use_recognized_placeholders() {
        for role in Role::ALL {
            let allowed = recognized_placeholders(role);
            let t = PromptTemplate::parse(default_template(role));
            for name in t.placeholders() {
                assert!(allowed.contains(&name), "{role} uses unrecognized {name}");
            }
        }
    }

    #[test]
    fn roles_only_see_earlier_slots() {
        let visionary = recognized_placeholders(Role::Visionary);
        assert!(!visionary.contains(&"vision"));

        let layout = recognized_placeholders(Role::Layout);
        for slot in ["vision", "tech_strategy", "design", "implementation"] {
            assert!(layout.contains(&slot));
        }
        assert!(!layout.contains(&"layout"));
    }

    #[test]
    fn layout_template_keeps_json_example() {
        let t = PromptTemplate::parse(default_template(Role::Layout));
        let rendered = t.render(&Default::default());
        assert!(rendered.contains(r#""directories": {"#));
        assert!(rendered.contains("```json"));
    }

    #[test]
    fn default_parameters_have_focus_areas() {
        for role in Role::ALL {
            assert!(!default_parameters(role).focus_areas.is_empty());
        }
    }
}
