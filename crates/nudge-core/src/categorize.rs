//! Transaction categorization
//!
//! Categorization is a black box behind the [`Categorizer`] trait so a
//! trained model can replace the built-in keyword rules. A categorizer error
//! only affects the transaction it was asked about.

use regex::Regex;
use tracing::trace;

use crate::error::Result;
use crate::models::{NewTransaction, TransactionKind};

/// Fallback label when nothing matches
pub const OTHER: &str = "other";

/// Maps a transaction to a category label
pub trait Categorizer: Send + Sync {
    fn name(&self) -> &str;

    /// Category for the transaction, or `None` when it cannot tell
    fn categorize(&self, tx: &NewTransaction) -> Result<Option<String>>;
}

/// Default keyword table
///
/// Earlier entries win when several categories match the same number of
/// keywords.
const KEYWORD_RULES: &[(&str, &[&str])] = &[
    (
        "delivery",
        &[
            "ifood", "rappi", "uber eats", "ze delivery", "aiqfome", "delivery", "entrega",
            "pizzaria", "hamburgueria", "sushi",
        ],
    ),
    (
        "food",
        &[
            "supermercado", "mercado", "acougue", "padaria", "hortifruti", "carrefour",
            "pao de acucar", "assai", "atacadao", "grocery", "supermarket", "bakery",
        ],
    ),
    (
        "transport",
        &[
            "uber", "99", "cabify", "taxi", "combustivel", "gasolina", "etanol", "posto",
            "shell", "ipiranga", "pedagio", "estacionamento", "parking", "metro", "onibus",
            "fuel",
        ],
    ),
    (
        "housing",
        &[
            "aluguel", "condominio", "iptu", "energia", "enel", "cemig", "sabesp", "comgas",
            "internet", "telefone", "vivo", "claro", "rent",
        ],
    ),
    (
        "health",
        &[
            "farmacia", "drogaria", "raia", "pacheco", "drogasil", "hospital", "clinica",
            "medico", "consulta", "exame", "laboratorio", "plano de saude", "unimed", "amil",
            "pharmacy",
        ],
    ),
    (
        "games",
        &[
            "steam", "playstation", "xbox", "nintendo", "epic games", "riot", "blizzard",
            "ubisoft", "game", "jogo", "bet", "aposta", "loteria", "mega sena",
        ],
    ),
    (
        "subscriptions",
        &[
            "assinatura", "mensalidade", "anual", "recorrente", "academia", "smart fit",
            "gympass", "subscription",
        ],
    ),
    (
        "leisure",
        &[
            "cinema", "teatro", "show", "ingresso", "netflix", "spotify", "amazon prime",
            "disney", "hbo", "globoplay", "youtube premium", "bar", "restaurante",
            "lanchonete", "cafe", "starbucks",
        ],
    ),
    (
        "education",
        &[
            "escola", "faculdade", "universidade", "curso", "udemy", "coursera", "alura",
            "livro", "livraria",
        ],
    ),
    (
        "shopping",
        &[
            "amazon", "mercado livre", "magalu", "magazine luiza", "americanas", "shopee",
            "aliexpress", "shein", "renner", "riachuelo", "zara", "shopping",
        ],
    ),
    (
        "transfer",
        &["pix", "ted", "doc", "transferencia", "deposito", "transfer"],
    ),
    (
        "salary",
        &["salario", "folha", "remuneracao", "pro labore", "payroll", "salary"],
    ),
    (
        "investments",
        &[
            "investimento", "aplicacao", "cdb", "tesouro", "fundo", "corretora", "nuinvest",
        ],
    ),
];

struct KeywordRule {
    category: String,
    patterns: Vec<Regex>,
}

/// Keyword matcher over description and payee
///
/// Keywords match whole words, case- and accent-insensitively. The category
/// with the most matching keywords wins.
pub struct KeywordCategorizer {
    rules: Vec<KeywordRule>,
}

impl KeywordCategorizer {
    /// Categorizer with the default keyword table
    pub fn new() -> Result<Self> {
        Self::from_rules(KEYWORD_RULES.iter().map(|(c, kws)| (*c, kws.iter().copied())))
    }

    /// Categorizer with a custom keyword table
    pub fn from_rules<'a, I, K>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, K)>,
        K: IntoIterator<Item = &'a str>,
    {
        let rules = rules
            .into_iter()
            .map(|(category, keywords)| -> Result<KeywordRule> {
                let patterns = keywords
                    .into_iter()
                    .map(|kw| Regex::new(&format!(r"\b{}\b", regex::escape(&fold(kw)))))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(KeywordRule {
                    category: category.to_string(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Best category and the number of keywords that matched
    pub fn best_match(&self, text: &str) -> Option<(&str, usize)> {
        let text = fold(text);
        let mut best: Option<(&str, usize)> = None;
        for rule in &self.rules {
            let hits = rule.patterns.iter().filter(|p| p.is_match(&text)).count();
            if hits > 0 && best.map_or(true, |(_, n)| hits > n) {
                best = Some((rule.category.as_str(), hits));
            }
        }
        best
    }
}

impl Categorizer for KeywordCategorizer {
    fn name(&self) -> &str {
        "keyword"
    }

    fn categorize(&self, tx: &NewTransaction) -> Result<Option<String>> {
        let text = format!("{} {}", tx.description, tx.payee.as_deref().unwrap_or(""));
        let category = match self.best_match(&text) {
            Some((category, hits)) => {
                trace!(category, hits, "Keyword match");
                category.to_string()
            }
            None if tx.kind == TransactionKind::Credit => return Ok(None),
            None => OTHER.to_string(),
        };
        Ok(Some(category))
    }
}

/// Lowercase, strip common Portuguese accents and punctuation
fn fold(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' => 'o',
            'ú' | 'ü' | 'ù' => 'u',
            'ç' => 'c',
            c if c.is_alphanumeric() || c.is_whitespace() => c,
            _ => ' ',
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
