//! Static translation tables for the messages the API hands back to users.
//! Spanish is the reference language; other tables fall back to it key by key.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
    Fr,
    De,
    It,
    Pt,
}

impl Default for Language {
    fn default() -> Self {
        Language::Es
    }
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Es,
        Language::En,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        let primary = code.trim().split(&['-', '_'][..]).next()?.to_ascii_lowercase();
        Language::ALL.into_iter().find(|l| l.code() == primary)
    }

    /// Picks the first supported language of an `Accept-Language` header,
    /// honouring q-values.
    pub fn from_accept_language(header: Option<&str>) -> Language {
        let Some(header) = header else {
            return Language::default();
        };

        let mut candidates: Vec<(f32, Language)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let tag = pieces.next()?;
                let quality = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Language::from_code(tag).map(|lang| (quality, lang))
            })
            .collect();

        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates
            .first()
            .map(|(_, lang)| *lang)
            .unwrap_or_default()
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::Es => ES,
            Language::En => EN,
            Language::Fr => FR,
            Language::De => DE,
            Language::It => IT,
            Language::Pt => PT,
        }
    }
}

pub fn translate(lang: Language, key: &str) -> &'static str {
    lookup(lang.table(), key)
        .or_else(|| lookup(ES, key))
        .unwrap_or("")
}

/// Translates and fills `{name}` placeholders.
pub fn translate_with(lang: Language, key: &str, args: &[(&str, String)]) -> String {
    let mut message = translate(lang, key).to_string();
    for (name, value) in args {
        message = message.replace(&format!("{{{}}}", name), value);
    }
    message
}

/// Full table for a language with Spanish filling any gaps.
pub fn full_table(lang: Language) -> Vec<(&'static str, &'static str)> {
    ES.iter()
        .map(|(key, _)| (*key, translate(lang, key)))
        .collect()
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

const ES: &[(&str, &str)] = &[
    ("upload.too_many_files", "Demasiados archivos. Máximo permitido: {max}"),
    ("upload.file_too_large", "El archivo {file} es demasiado grande. Máximo: {max} MB"),
    ("upload.invalid_type", "Tipo de archivo no válido: {file}"),
    ("upload.quota_exceeded", "El almacenamiento está lleno. Contacte al administrador"),
    ("upload.network", "Error de conexión. Verifique su conexión a internet"),
    ("upload.server", "Error del servidor. Intente de nuevo más tarde"),
    ("upload.timeout", "La subida tardó demasiado. Intente de nuevo"),
    ("upload.empty", "No se seleccionó ningún archivo"),
    ("upload.index_out_of_range", "El archivo que intenta eliminar no existe"),
    ("upload.success", "Archivos subidos correctamente"),
    ("upload.unknown_kind", "Tipo de carga desconocido"),
    ("upload.invalid_field", "Campo de formulario no válido: {field}"),
    ("auth.login_required", "Debe iniciar sesión para continuar"),
    ("auth.access_denied", "Acceso denegado. No tiene permisos para ver esta página"),
    ("auth.session_expired", "Su sesión se cerró por inactividad"),
];

const EN: &[(&str, &str)] = &[
    ("upload.too_many_files", "Too many files. Maximum allowed: {max}"),
    ("upload.file_too_large", "File {file} is too large. Maximum: {max} MB"),
    ("upload.invalid_type", "Invalid file type: {file}"),
    ("upload.quota_exceeded", "Storage is full. Please contact the administrator"),
    ("upload.network", "Connection error. Check your internet connection"),
    ("upload.server", "Server error. Please try again later"),
    ("upload.timeout", "The upload took too long. Please try again"),
    ("upload.empty", "No file was selected"),
    ("upload.index_out_of_range", "The file you are trying to remove does not exist"),
    ("upload.success", "Files uploaded successfully"),
    ("upload.unknown_kind", "Unknown upload type"),
    ("upload.invalid_field", "Invalid form field: {field}"),
    ("auth.login_required", "You must sign in to continue"),
    ("auth.access_denied", "Access denied. You do not have permission to view this page"),
    ("auth.session_expired", "Your session was closed due to inactivity"),
];

const FR: &[(&str, &str)] = &[
    ("upload.too_many_files", "Trop de fichiers. Maximum autorisé : {max}"),
    ("upload.file_too_large", "Le fichier {file} est trop volumineux. Maximum : {max} Mo"),
    ("upload.invalid_type", "Type de fichier non valide : {file}"),
    ("upload.quota_exceeded", "Le stockage est plein. Contactez l'administrateur"),
    ("upload.network", "Erreur de connexion. Vérifiez votre connexion internet"),
    ("upload.server", "Erreur du serveur. Réessayez plus tard"),
    ("upload.timeout", "L'envoi a pris trop de temps. Réessayez"),
    ("upload.empty", "Aucun fichier sélectionné"),
    ("upload.success", "Fichiers envoyés avec succès"),
    ("auth.login_required", "Vous devez vous connecter pour continuer"),
    ("auth.access_denied", "Accès refusé. Vous n'avez pas la permission de voir cette page"),
    ("auth.session_expired", "Votre session a été fermée pour inactivité"),
];

const DE: &[(&str, &str)] = &[
    ("upload.too_many_files", "Zu viele Dateien. Maximal erlaubt: {max}"),
    ("upload.file_too_large", "Die Datei {file} ist zu groß. Maximum: {max} MB"),
    ("upload.invalid_type", "Ungültiger Dateityp: {file}"),
    ("upload.quota_exceeded", "Der Speicher ist voll. Bitte wenden Sie sich an den Administrator"),
    ("upload.network", "Verbindungsfehler. Prüfen Sie Ihre Internetverbindung"),
    ("upload.server", "Serverfehler. Bitte später erneut versuchen"),
    ("upload.timeout", "Der Upload hat zu lange gedauert. Bitte erneut versuchen"),
    ("upload.empty", "Keine Datei ausgewählt"),
    ("upload.success", "Dateien erfolgreich hochgeladen"),
    ("auth.login_required", "Bitte melden Sie sich an, um fortzufahren"),
    ("auth.access_denied", "Zugriff verweigert. Sie dürfen diese Seite nicht sehen"),
    ("auth.session_expired", "Ihre Sitzung wurde wegen Inaktivität beendet"),
];

const IT: &[(&str, &str)] = &[
    ("upload.too_many_files", "Troppi file. Massimo consentito: {max}"),
    ("upload.file_too_large", "Il file {file} è troppo grande. Massimo: {max} MB"),
    ("upload.invalid_type", "Tipo di file non valido: {file}"),
    ("upload.quota_exceeded", "Lo spazio di archiviazione è pieno. Contatta l'amministratore"),
    ("upload.network", "Errore di connessione. Controlla la tua connessione internet"),
    ("upload.server", "Errore del server. Riprova più tardi"),
    ("upload.timeout", "Il caricamento ha impiegato troppo tempo. Riprova"),
    ("upload.empty", "Nessun file selezionato"),
    ("upload.success", "File caricati correttamente"),
    ("auth.login_required", "Devi accedere per continuare"),
    ("auth.access_denied", "Accesso negato. Non hai i permessi per vedere questa pagina"),
    ("auth.session_expired", "La sessione è stata chiusa per inattività"),
];

const PT: &[(&str, &str)] = &[
    ("upload.too_many_files", "Arquivos demais. Máximo permitido: {max}"),
    ("upload.file_too_large", "O arquivo {file} é grande demais. Máximo: {max} MB"),
    ("upload.invalid_type", "Tipo de arquivo inválido: {file}"),
    ("upload.quota_exceeded", "O armazenamento está cheio. Contate o administrador"),
    ("upload.network", "Erro de conexão. Verifique sua conexão com a internet"),
    ("upload.server", "Erro no servidor. Tente novamente mais tarde"),
    ("upload.timeout", "O envio demorou demais. Tente novamente"),
    ("upload.empty", "Nenhum arquivo selecionado"),
    ("upload.success", "Arquivos enviados com sucesso"),
    ("auth.login_required", "Você precisa entrar para continuar"),
    ("auth.access_denied", "Acesso negado. Você não tem permissão para ver esta página"),
    ("auth.session_expired", "Sua sessão foi encerrada por inatividade"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_prefers_highest_quality_supported_tag() {
        assert_eq!(Language::from_accept_language(Some("en-US,en;q=0.9")), Language::En);
        assert_eq!(Language::from_accept_language(Some("ja,fr;q=0.8,de;q=0.9")), Language::De);
        assert_eq!(Language::from_accept_language(Some("ja")), Language::Es);
        assert_eq!(Language::from_accept_language(None), Language::Es);
    }

    #[test]
    fn missing_keys_fall_back_to_spanish() {
        assert_eq!(
            translate(Language::Fr, "upload.index_out_of_range"),
            "El archivo que intenta eliminar no existe"
        );
        assert_eq!(translate(Language::En, "does.not.exist"), "");
    }

    #[test]
    fn placeholders_are_filled() {
        let msg = translate_with(Language::Es, "upload.too_many_files", &[("max", "5".to_string())]);
        assert_eq!(msg, "Demasiados archivos. Máximo permitido: 5");
    }

    #[test]
    fn every_table_covers_every_reference_key() {
        for lang in Language::ALL {
            let table = full_table(lang);
            assert_eq!(table.len(), ES.len());
            assert!(table.iter().all(|(_, v)| !v.is_empty()));
        }
    }
}
