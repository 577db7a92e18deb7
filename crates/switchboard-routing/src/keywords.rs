//! Static keyword table used by the intent classifier

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::intent::IntentCategory;

/// Weight tier of a keyword within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordTier {
    High,
    Medium,
    Tools,
    Low,
}

impl KeywordTier {
    /// Score contributed by one matching token
    pub const fn weight(self) -> u32 {
        match self {
            Self::High => 3,
            Self::Medium | Self::Tools => 2,
            Self::Low => 1,
        }
    }
}

/// Token -> every (category, tier) the token belongs to
///
/// A token listed in several tiers or categories contributes once per
/// membership.
pub static KEYWORD_INDEX: LazyLock<HashMap<&'static str, Vec<(IntentCategory, KeywordTier)>>> =
    LazyLock::new(|| {
        let mut index: HashMap<&'static str, Vec<(IntentCategory, KeywordTier)>> = HashMap::new();

        for (category, tier, words) in TABLE {
            for word in *words {
                index.entry(*word).or_default().push((*category, *tier));
            }
        }

        index
    });

type TierList = (IntentCategory, KeywordTier, &'static [&'static str]);

const TABLE: &[TierList] = &[
    (IntentCategory::Coding, KeywordTier::High, CODING_HIGH),
    (IntentCategory::Coding, KeywordTier::Medium, CODING_MEDIUM),
    (IntentCategory::Coding, KeywordTier::Tools, CODING_TOOLS),
    (IntentCategory::Coding, KeywordTier::Low, CODING_LOW),
    (IntentCategory::Math, KeywordTier::High, MATH_HIGH),
    (IntentCategory::Math, KeywordTier::Medium, MATH_MEDIUM),
    (IntentCategory::Math, KeywordTier::Low, MATH_LOW),
    (IntentCategory::Creative, KeywordTier::High, CREATIVE_HIGH),
    (IntentCategory::Creative, KeywordTier::Medium, CREATIVE_MEDIUM),
    (IntentCategory::Creative, KeywordTier::Low, CREATIVE_LOW),
    (IntentCategory::Reasoning, KeywordTier::High, REASONING_HIGH),
    (IntentCategory::Reasoning, KeywordTier::Medium, REASONING_MEDIUM),
    (IntentCategory::Reasoning, KeywordTier::Low, REASONING_LOW),
];

const CODING_HIGH: &[&str] = &[
    "python", "javascript", "typescript", "java", "c++", "cpp", "csharp", "c#", "rust", "go", "golang", "php",
    "ruby", "swift", "kotlin", "scala", "perl", "bash", "shell", "powershell", "lua", "dart", "elixir", "haskell",
    "clojure", "assembly", "fortran", "cobol", "lisp", "prolog", "erlang", "objective-c", "r", "matlab", "julia",
    "groovy", "pascal", "vb.net",
];

const CODING_MEDIUM: &[&str] = &[
    "code", "function", "method", "class", "object", "variable", "array", "loop", "iteration", "recursion",
    "algorithm", "datastructure", "stack", "queue", "linkedlist", "tree", "graph", "hash", "sorting", "searching",
    "api", "rest", "graphql", "endpoint", "middleware", "framework", "library", "package", "module", "import",
    "export", "namespace", "interface", "inheritance", "polymorphism", "encapsulation", "abstraction", "oop",
    "async", "await", "promise", "callback", "thread", "process", "concurrency", "parallelism", "mutex",
    "semaphore", "deadlock", "racecondition", "compile", "runtime", "interpreter", "compiler", "bytecode", "jit",
    "garbage", "memory", "pointer", "reference", "malloc", "free", "try", "catch", "throw", "exception", "error",
    "bug", "debug", "breakpoint", "refactor", "optimize", "performance", "benchmark", "profiling",
];

const CODING_TOOLS: &[&str] = &[
    "git", "github", "gitlab", "docker", "kubernetes", "jenkins", "ci/cd", "npm", "yarn", "pip", "maven",
    "gradle", "webpack", "babel", "eslint", "vscode", "intellij", "eclipse", "vim", "emacs", "ide", "editor",
    "react", "angular", "vue", "nextjs", "nuxt", "svelte", "jquery", "nodejs", "node.js", "express", "fastify",
    "nestjs", "django", "flask", "spring", "laravel", "rails", ".net", "asp.net", "blazor", "mongodb",
    "postgresql", "mysql", "redis", "elasticsearch", "cassandra", "sql", "nosql", "orm", "prisma", "sequelize",
    "mongoose", "typeorm", "aws", "azure", "gcp", "heroku", "vercel", "netlify", "cloudflare",
];

const CODING_LOW: &[&str] = &[
    "syntax", "semicolon", "bracket", "parenthesis", "indentation", "comment", "string", "integer", "float",
    "boolean", "null", "undefined", "nan", "const", "let", "var", "static", "final", "public", "private",
    "protected", "if", "else", "switch", "case", "for", "while", "do", "break", "continue", "return", "yield",
    "lambda", "arrow", "ternary", "operator", "expression", "statement", "block", "scope", "closure", "hoisting",
    "prototype", "json", "xml", "yaml", "toml", "csv", "regex", "pattern", "match",
];

const MATH_HIGH: &[&str] = &[
    "calculus", "algebra", "geometry", "trigonometry", "statistics", "probability", "differential", "integral",
    "derivative", "limit", "theorem", "proof", "matrix", "vector", "tensor", "eigenvalue", "determinant",
    "polynomial", "logarithm", "exponential", "factorial", "permutation", "combination",
];

const MATH_MEDIUM: &[&str] = &[
    "equation", "formula", "calculate", "compute", "solve", "simplify", "evaluate", "integrate", "differentiate",
    "optimize", "maximize", "minimize", "sum", "product", "quotient", "remainder", "modulo", "absolute", "square",
    "cube", "root", "power", "exponent", "base",
];

const MATH_LOW: &[&str] = &[
    "math", "number", "digit", "integer", "decimal", "fraction", "ratio", "add", "subtract", "multiply", "divide",
    "plus", "minus", "times",
];

const CREATIVE_HIGH: &[&str] = &[
    "story", "poem", "lyrics", "screenplay", "dialogue", "narrative", "character", "plot", "setting", "chapter",
    "verse", "stanza", "fiction", "fantasy", "scifi", "romance", "thriller", "mystery",
];

const CREATIVE_MEDIUM: &[&str] = &[
    "write", "create", "compose", "draft", "brainstorm", "imagine", "describe", "illustrate", "portray", "depict",
    "creative", "artistic",
];

const CREATIVE_LOW: &[&str] = &["idea", "concept", "theme", "style", "tone", "mood", "voice"];

const REASONING_HIGH: &[&str] = &[
    "analyze", "evaluate", "compare", "contrast", "critique", "assess", "reasoning", "logic", "argument",
    "premise", "conclusion", "inference", "deduction", "induction", "hypothesis", "evidence", "proof",
];

const REASONING_MEDIUM: &[&str] = &[
    "explain", "why", "how", "what", "when", "where", "who", "which", "because", "therefore", "thus", "hence",
    "consequently", "implies",
];

const REASONING_LOW: &[&str] = &["think", "consider", "reason", "understand", "comprehend", "grasp"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_lowercase() {
        for (_, _, words) in TABLE {
            for word in *words {
                assert_eq!(*word, word.to_lowercase(), "keyword `{word}` must be lowercase");
            }
        }
    }

    #[test]
    fn shared_tokens_index_every_membership() {
        let proof = &KEYWORD_INDEX["proof"];
        assert!(proof.contains(&(IntentCategory::Math, KeywordTier::High)));
        assert!(proof.contains(&(IntentCategory::Reasoning, KeywordTier::High)));

        let integer = &KEYWORD_INDEX["integer"];
        assert_eq!(integer.len(), 2);
    }
}
