// service/aura_service.rs
//
// AURA: AI-assisted listing descriptions and reply drafts, backed by an
// OpenAI-compatible chat-completions endpoint.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::Config,
    dtos::functiondtos::{GenerateDescriptionDto, GenerateResponseDto},
    utils::i18n::Language,
};

#[derive(Debug, Error)]
pub enum AuraError {
    #[error("LLM_API_KEY is not configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned an error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct AuraService {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

fn language_name(lang: Language) -> &'static str {
    match lang {
        Language::Es => "español",
        Language::En => "English",
        Language::Fr => "français",
        Language::De => "Deutsch",
        Language::It => "italiano",
        Language::Pt => "português",
    }
}

fn requested_language(code: Option<&str>) -> Language {
    code.and_then(Language::from_code).unwrap_or_default()
}

pub fn description_system_prompt(lang: Language) -> String {
    format!(
        "Eres AURA, asistente de redacción de una inmobiliaria. Escribe descripciones \
         de propiedades atractivas, honestas y profesionales, de 120 a 180 palabras, \
         sin inventar características que no se te den. Responde únicamente con la \
         descripción, en {}.",
        language_name(lang)
    )
}

pub fn description_prompt(dto: &GenerateDescriptionDto) -> String {
    let mut lines = vec![format!("Título: {}", dto.title)];

    if let Some(kind) = &dto.property_type {
        lines.push(format!("Tipo: {}", kind));
    }
    if let Some(transaction) = &dto.transaction_type {
        lines.push(format!("Operación: {}", transaction));
    }
    if let Some(price) = &dto.price {
        let currency = dto.currency.as_deref().unwrap_or("MXN");
        lines.push(format!("Precio: {} {}", price, currency));
    }
    if let Some(bedrooms) = dto.bedrooms {
        lines.push(format!("Recámaras: {}", bedrooms));
    }
    if let Some(bathrooms) = dto.bathrooms {
        lines.push(format!("Baños: {}", bathrooms));
    }
    if let Some(area) = dto.area_m2 {
        lines.push(format!("Superficie: {} m²", area));
    }
    match (&dto.address, &dto.city) {
        (Some(address), Some(city)) => lines.push(format!("Ubicación: {}, {}", address, city)),
        (None, Some(city)) => lines.push(format!("Ciudad: {}", city)),
        (Some(address), None) => lines.push(format!("Ubicación: {}", address)),
        (None, None) => {}
    }
    if !dto.features.is_empty() {
        lines.push(format!("Características: {}", dto.features.join(", ")));
    }

    format!(
        "Redacta la descripción de esta propiedad:\n{}",
        lines.join("\n")
    )
}

pub fn response_system_prompt(lang: Language) -> String {
    format!(
        "Eres AURA, asistente de atención al cliente de una inmobiliaria. Redacta una \
         respuesta breve, cordial y profesional al mensaje del cliente. Si la reseña es \
         negativa, reconoce el problema sin ponerte a la defensiva y ofrece seguimiento. \
         No prometas nada que no se pueda cumplir. Responde en {}.",
        language_name(lang)
    )
}

pub fn response_prompt(dto: &GenerateResponseDto) -> String {
    let mut prompt = String::new();
    if let Some(name) = &dto.customer_name {
        prompt.push_str(&format!("Cliente: {}\n", name));
    }
    if let Some(agent) = &dto.agent_name {
        prompt.push_str(&format!("Firma como: {}\n", agent));
    }
    if let Some(rating) = dto.rating {
        prompt.push_str(&format!("Calificación: {}/5\n", rating));
    }
    if let Some(context) = &dto.context {
        prompt.push_str(&format!("Contexto: {}\n", context));
    }
    prompt.push_str(&format!("Mensaje del cliente:\n{}", dto.message));
    prompt
}

impl AuraService {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs.max(30)))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: config.llm_api_key.clone(),
            api_url: config.llm_api_url.clone(),
            model: config.llm_model.clone(),
        }
    }

    pub async fn generate_description(
        &self,
        dto: &GenerateDescriptionDto,
    ) -> Result<String, AuraError> {
        let lang = requested_language(dto.language.as_deref());
        self.complete(&description_system_prompt(lang), &description_prompt(dto), 0.7)
            .await
    }

    pub async fn generate_response(&self, dto: &GenerateResponseDto) -> Result<String, AuraError> {
        let lang = requested_language(dto.language.as_deref());
        self.complete(&response_system_prompt(lang), &response_prompt(dto), 0.5)
            .await
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, AuraError> {
        let api_key = self.api_key.as_deref().ok_or(AuraError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens: 600,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AuraError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            tracing::error!("LLM API error ({}): {}", status, message);
            return Err(AuraError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AuraError::Request(e.to_string()))?;

        extract_completion(body)
    }
}

fn extract_completion(body: ChatResponse) -> Result<String, AuraError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(AuraError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description_dto() -> GenerateDescriptionDto {
        GenerateDescriptionDto {
            title: "Casa con jardín en Coyoacán".to_string(),
            property_type: Some("casa".to_string()),
            transaction_type: Some("venta".to_string()),
            price: Some("4500000".to_string()),
            currency: None,
            bedrooms: Some(3),
            bathrooms: Some(2),
            area_m2: Some(180.0),
            city: Some("Ciudad de México".to_string()),
            address: None,
            features: vec!["jardín".to_string(), "cochera".to_string()],
            language: Some("en-US".to_string()),
        }
    }

    #[test]
    fn description_prompt_lists_known_facts_only() {
        let prompt = description_prompt(&description_dto());
        assert!(prompt.contains("Recámaras: 3"));
        assert!(prompt.contains("Precio: 4500000 MXN"));
        assert!(prompt.contains("Ciudad: Ciudad de México"));
        assert!(prompt.contains("Características: jardín, cochera"));
        assert!(!prompt.contains("Ubicación"));
    }

    #[test]
    fn requested_language_reaches_system_prompt() {
        let lang = requested_language(description_dto().language.as_deref());
        assert_eq!(lang, Language::En);
        assert!(description_system_prompt(lang).ends_with("en English."));
        assert_eq!(requested_language(None), Language::Es);
    }

    #[test]
    fn response_prompt_includes_rating_and_message() {
        let dto = GenerateResponseDto {
            message: "El agente nunca llegó a la cita".to_string(),
            customer_name: Some("Rosa".to_string()),
            agent_name: None,
            rating: Some(1),
            context: None,
            language: None,
        };
        let prompt = response_prompt(&dto);
        assert!(prompt.starts_with("Cliente: Rosa\n"));
        assert!(prompt.contains("Calificación: 1/5"));
        assert!(prompt.ends_with("El agente nunca llegó a la cita"));
    }

    #[test]
    fn empty_completion_is_an_error() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(extract_completion(body), Err(AuraError::EmptyCompletion)));

        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":" Hola "}}]}"#).unwrap();
        assert_eq!(extract_completion(body).unwrap(), "Hola");
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let service = AuraService::new(&Config::for_tests());
        let err = service.generate_description(&description_dto()).await.unwrap_err();
        assert!(matches!(err, AuraError::NotConfigured));
    }
}
