//! Decoding of DataJud search responses.
//!
//! DataJud is an Elasticsearch index per court. A page looks like:
//! - `hits.hits[]._source`: the process document
//! - `hits.hits[].sort`: the `search_after` token for the next page
//!
//! Field names drifted between index versions, so the source document is
//! read leniently: every field is optional and older aliases are accepted.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{CourtCode, Movement};

/// Top-level search response.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// One search hit.
#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source", default)]
    pub source: Value,
    #[serde(default)]
    pub sort: Option<Vec<Value>>,
}

/// Named code-table entry (`{"codigo": 7, "nome": "Procedimento Comum"}`),
/// or a bare string in older documents.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Named {
    Entry {
        #[serde(default)]
        nome: Option<String>,
    },
    Text(String),
}

impl Named {
    fn name(&self) -> Option<&str> {
        match self {
            Self::Entry { nome } => nome.as_deref(),
            Self::Text(text) => Some(text.as_str()),
        }
        .map(str::trim)
        .filter(|s| !s.is_empty())
    }
}

/// `_source` document of a process.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSource {
    #[serde(default)]
    pub numero_processo: Option<String>,
    #[serde(default, alias = "classeProcessual")]
    pub classe: Option<Named>,
    #[serde(default, alias = "assuntosProcessuais")]
    pub assuntos: Vec<Named>,
    #[serde(default)]
    pub orgao_julgador: Option<OrgaoJulgador>,
    #[serde(default)]
    pub grau: Option<String>,
    #[serde(default, alias = "situacaoProcessual")]
    pub situacao: Option<Named>,
    #[serde(default, alias = "dataDistribuicao")]
    pub data_ajuizamento: Option<String>,
    #[serde(default)]
    pub partes: Vec<Parte>,
    #[serde(default)]
    pub movimentos: Vec<Movimento>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrgaoJulgador {
    #[serde(default, alias = "nomeOrgao")]
    pub nome: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parte {
    #[serde(default, alias = "polo")]
    pub tipo_parte: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movimento {
    #[serde(default)]
    pub data_hora: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub complementos_tabelados: Vec<Complemento>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Complemento {
    #[serde(default)]
    pub nome: Option<String>,
}

/// A process decoded from a hit, before indicators are computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedProcess {
    pub process_number: String,
    pub court: CourtCode,
    pub subject: String,
    pub parties: String,
    pub filing_date: Option<NaiveDate>,
    pub class: Option<String>,
    pub judging_body: Option<String>,
    pub degree: Option<String>,
    pub status: Option<String>,
    pub movements: Vec<Movement>,
}

/// Parse the timestamp formats DataJud emits.
///
/// Seen in the wild: RFC 3339 (`2021-05-10T13:45:00.000Z`), naive ISO
/// (`2021-05-10T13:45:00`), compact (`20210510134500`) and plain dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y%m%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl Movimento {
    /// Free-text description: explicit `descricao`, else the movement name
    /// followed by its tabled complements.
    fn description(&self) -> String {
        if let Some(text) = self.descricao.as_deref().map(str::trim) {
            if !text.is_empty() {
                return text.to_string();
            }
        }

        let mut parts: Vec<&str> = Vec::new();
        if let Some(nome) = self.nome.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(nome);
        }
        parts.extend(
            self.complementos_tabelados
                .iter()
                .filter_map(|c| c.nome.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        );
        parts.join(" - ")
    }
}

/// Decode a hit's `_source` into a process.
///
/// Returns `None`, with a WARN event, when the document does not decode or
/// has no process number, which makes it useless as a dataset row.
#[must_use]
pub fn decode_process(court: &CourtCode, source: &Value) -> Option<DecodedProcess> {
    let src: ProcessSource = match serde_json::from_value(source.clone()) {
        Ok(src) => src,
        Err(e) => {
            tracing::warn!(court = %court, error = %e, "Skipping undecodable hit");
            return None;
        }
    };

    let Some(process_number) = src
        .numero_processo
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
    else {
        tracing::warn!(court = %court, "Skipping hit without process number");
        return None;
    };

    let subject = src
        .assuntos
        .iter()
        .filter_map(Named::name)
        .collect::<Vec<_>>()
        .join(", ");

    let parties = src
        .partes
        .iter()
        .map(|p| {
            format!(
                "{}: {}",
                p.tipo_parte.as_deref().unwrap_or_default().trim(),
                p.nome.as_deref().unwrap_or_default().trim()
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    let movements = src
        .movimentos
        .iter()
        .map(|m| {
            Movement::new(
                m.data_hora.as_deref().and_then(parse_timestamp),
                m.description(),
            )
        })
        .collect();

    Some(DecodedProcess {
        process_number,
        court: court.clone(),
        subject,
        parties,
        filing_date: src
            .data_ajuizamento
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt| dt.date()),
        class: src.classe.as_ref().and_then(Named::name).map(String::from),
        judging_body: src
            .orgao_julgador
            .and_then(|o| o.nome)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        degree: src.grau.filter(|s| !s.trim().is_empty()),
        status: src.situacao.as_ref().and_then(Named::name).map(String::from),
        movements,
    })
}
