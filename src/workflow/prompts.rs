// Instruction templates for the pipeline stages
//
// The wording here shapes output quality but not workflow behavior; the
// engine only cares that each helper yields one prompt string.

pub const REFINE_SYSTEM: &str = "You are an expert software architect. You refine rough project \
descriptions into clear, comprehensive ones.";

pub const ARCHITECT_SYSTEM: &str = "You are a senior software architect with expertise in designing \
scalable, maintainable systems.";

pub const DIAGRAM_SYSTEM: &str = "You are a Mermaid.js diagram expert. You transform architecture \
specifications into valid, clean Mermaid.js flowchart code.";

/// Refine stage: improve the raw project description.
pub fn refine_prompt(raw_input: &str) -> String {
    format!(
        "Refine and improve the following project description. Fix any typos, \
clarify ambiguous points, and ensure it is comprehensive.\n\n\
Original description:\n{raw_input}\n\n\
Provide a well-structured and clear description."
    )
}

/// First-pass specification generation from the refined description.
pub fn generate_spec_prompt(refined_description: &str) -> String {
    format!(
        "Based on the following project description, create a comprehensive software \
architecture that balances technical excellence with practical implementation \
considerations.\n\n\
PROJECT DESCRIPTION:\n{refined_description}\n\n\
Deliver a professional-grade architecture specification with these sections:\n\n\
## 1. CORE COMPONENTS\n\
Identify all primary system components, their responsibilities, boundaries, and interfaces.\n\n\
## 2. COMPONENT RELATIONSHIPS\n\
Define interaction patterns, communication protocols, synchronous vs. asynchronous \
interactions, and dependency directions.\n\n\
## 3. TECHNOLOGY STACK\n\
Select appropriate technologies for each component with rationale, and address \
cross-cutting concerns (logging, monitoring, security).\n\n\
## 4. DATA FLOW\n\
Map the journey of data through the system, transformations between components, \
potential bottlenecks, and persistence/caching strategies.\n\n\
## 5. INTEGRATION POINTS\n\
Define external interfaces, API contracts, authentication requirements, and \
error handling patterns.\n\n\
## 6. DEPLOYMENT CONSIDERATIONS\n\
Recommend deployment topologies, scalability and availability requirements, and \
CI/CD considerations."
    )
}

/// Revision pass: rework the existing specification against the latest feedback.
pub fn revise_spec_prompt(architecture_spec: &str, feedback: &str) -> String {
    format!(
        "Refine the existing architecture below based on stakeholder feedback. \
Thoughtfully incorporate the feedback while maintaining architectural integrity \
and coherence.\n\n\
CURRENT ARCHITECTURE:\n{architecture_spec}\n\n\
STAKEHOLDER FEEDBACK:\n{feedback}\n\n\
Provide a revised architecture specification with the same section structure \
(CORE COMPONENTS, COMPONENT RELATIONSHIPS, TECHNOLOGY STACK, DATA FLOW, \
INTEGRATION POINTS, DEPLOYMENT CONSIDERATIONS). For each significant change, \
briefly explain how it addresses the feedback."
    )
}

/// Diagram stage: render the approved specification as Mermaid flowchart code.
pub fn diagram_prompt(architecture_spec: &str) -> String {
    format!(
        "Transform the following architecture specification into valid Mermaid.js code \
that prioritizes simplicity and visual clarity.\n\n\
Architecture specification:\n{architecture_spec}\n\n\
Strict rules:\n\
- Begin with exactly `flowchart TD`.\n\
- Declare nodes first, then relationships, then style assignments.\n\
- End every statement with a semicolon.\n\
- No spaces or special characters in node IDs; use camelCase.\n\
- Node labels in square brackets: nodeId[\"Display Text\"]; databases as \
databaseId[(Database Name)];.\n\
- Relationships use simple arrows only: nodeA --> nodeB;.\n\
- Close every subgraph with `end;`.\n\n\
Provide ONLY the complete Mermaid.js code, with no explanations or text outside it."
    )
}

/// System prompt for the satisfaction classifier. The specification under
/// review is embedded as context.
pub fn classifier_system(architecture_spec: &str) -> String {
    format!(
        "You review the architecture stage of a project based on user feedback. \
Evaluate the feedback and determine:\n\
1. whether the user is satisfied with the current architecture, and\n\
2. what specific changes they want, if any.\n\n\
Architecture under review:\n{architecture_spec}\n\n\
Return ONLY a JSON object with exactly two keys:\n\
- \"is_satisfied\": boolean, true if the user is satisfied\n\
- \"detail\": string describing the changes the user wants (empty if satisfied)"
    )
}
