//! Fixed lookup tables for the emotion analyzer. Kept in one file since
//! they are data, not behaviour, and the analyzer logic reads more clearly
//! without them interleaved.

/// The 15 semantic categories used to build activity prototypes, each
/// seeded with a handful of Spanish keywords.
pub const KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    (
        "high_energy",
        &[
            "bailar",
            "fiesta",
            "celebrar",
            "entrenar",
            "gimnasio",
            "correr",
            "ejercicio intenso",
            "moverme",
            "activarme",
        ],
    ),
    (
        "low_energy",
        &["estudiar", "concentrarme", "leer", "trabajar", "relajarme", "descansar", "tranquilidad"],
    ),
    (
        "happy",
        &[
            "feliz", "alegre", "contento", "alegría", "felicidad", "animado", "bien", "genial",
            "fantástico", "dichoso",
        ],
    ),
    (
        "romantic",
        &["cita romántica", "pareja", "amor", "romántico", "momento íntimo", "aniversario"],
    ),
    ("sad", &["triste", "llorar", "melancolía", "dolor", "tristeza", "pena", "soledad"]),
    ("angry", &["rabia", "enfado", "frustración", "ira", "molesto", "enojado", "irritado"]),
    ("sleep", &["dormir", "sueño", "descanso nocturno", "conciliar sueño", "noche"]),
    (
        "party",
        &["fiesta", "rumba", "discoteca", "salir de fiesta", "celebración", "pasarla bien"],
    ),
    (
        "workout",
        &["gimnasio", "gym", "pesas", "entrenar duro", "rutina ejercicio", "fitness"],
    ),
    (
        "nostalgic",
        &["nostalgia", "recuerdos", "pasado", "extrañar", "tiempos antiguos", "memorias", "recordar"],
    ),
    (
        "motivated",
        &["motivación", "motivado", "inspiración", "inspirado", "empujón", "ánimo", "impulso"],
    ),
    (
        "stressed",
        &["estrés", "estresado", "agobio", "presión", "ansiedad", "nervios", "tensión"],
    ),
    (
        "confident",
        &["confianza", "seguro", "empoderado", "fuerte", "capaz", "poder", "autoestima"],
    ),
    ("relaxed", &["relajado", "tranquilo", "paz", "calma", "sereno", "descanso", "sosiego"]),
    (
        "bored",
        &["aburrido", "aburrimiento", "tedio", "monotonía", "sin hacer nada", "rutina pesada"],
    ),
];

/// Prompt templates crossed with each keyword to build the prototype corpus.
pub const TEMPLATES: &[&str] = &[
    "{keyword}",
    "música para {keyword}",
    "quiero {keyword}",
    "necesito {keyword}",
    "momento de {keyword}",
    "cuando estoy {keyword}",
    "para {keyword}",
    "mientras {keyword}",
    "estado de {keyword}",
    "sentirse {keyword}",
];

/// Direct, unambiguous category -> emotion mapping.
pub fn strong_mapping(category: &str) -> Option<&'static str> {
    Some(match category {
        "happy" => "joy",
        "sad" => "sadness",
        "angry" => "anger",
        "romantic" => "love",
        "sleep" => "sleep",
        "workout" => "workout",
        "party" => "party",
        "nostalgic" => "nostalgic",
        "motivated" => "motivated",
        "stressed" => "stressed",
        "confident" => "confident",
        "relaxed" => "relaxed",
        "bored" => "bored",
        _ => return None,
    })
}

/// Sentiment-disambiguated mapping for the two broad energy categories.
pub fn weak_mapping(category: &str, sentiment: &str) -> Option<&'static str> {
    let normalized = match sentiment {
        "pos" => "positive",
        "neg" => "negative",
        other => other,
    };

    match (category, normalized) {
        ("high_energy", "positive") => Some("excitement"),
        ("high_energy", "negative") => Some("stressed"),
        ("high_energy", "neutral") => Some("excitement"),
        ("low_energy", "positive") => Some("relaxed"),
        ("low_energy", "negative") => Some("sadness"),
        ("low_energy", "neutral") => Some("focus"),
        _ => None,
    }
}

/// Plain sentiment -> emotion fallback, used when semantic similarity is
/// below threshold.
pub fn sentiment_to_emotion(sentiment: &str) -> &'static str {
    match sentiment {
        "positive" | "pos" => "joy",
        "negative" | "neg" => "sadness",
        _ => "neutral",
    }
}

/// `(valence, energy)` for each final emotion.
pub fn dimensions_for(emotion: &str) -> (f32, f32) {
    match emotion {
        "sadness" => (0.20, 0.30),
        "joy" => (0.90, 0.70),
        "anger" => (0.30, 0.90),
        "fear" => (0.30, 0.40),
        "love" => (0.80, 0.50),
        "neutral" => (0.50, 0.50),
        "excitement" => (0.85, 0.95),
        "focus" => (0.50, 0.40),
        "sleep" => (0.60, 0.15),
        "party" => (0.90, 0.95),
        "workout" => (0.70, 0.95),
        "chill" => (0.60, 0.20),
        "nostalgic" => (0.40, 0.35),
        "motivated" => (0.80, 0.85),
        "stressed" => (0.30, 0.60),
        "confident" => (0.85, 0.75),
        "relaxed" => (0.70, 0.25),
        "bored" => (0.40, 0.30),
        _ => (0.50, 0.50),
    }
}

/// Suggested genres (strongest first) for each final emotion.
pub fn genres_for(emotion: &str) -> &'static [&'static str] {
    match emotion {
        "sadness" => &["sad", "chill", "pop"],
        "joy" => &["happy", "pop", "dance", "party"],
        "anger" => &["rock", "workout"],
        "fear" => &["chill", "sad"],
        "love" => &["pop", "happy"],
        "neutral" => &["pop", "happy", "party"],
        "excitement" => &["party", "dance", "happy"],
        "focus" => &["chill", "pop"],
        "sleep" => &["chill", "sad"],
        "party" => &["party", "dance", "happy"],
        "workout" => &["workout", "rock", "party"],
        "chill" => &["chill", "sad", "pop"],
        "nostalgic" => &["sad", "pop", "chill"],
        "motivated" => &["workout", "rock", "party", "happy"],
        "stressed" => &["chill", "sad"],
        "confident" => &["pop", "rock", "party"],
        "relaxed" => &["chill", "pop"],
        "bored" => &["pop", "party", "dance"],
        _ => &["pop"],
    }
}

/// Emotional descriptor phrase appended to a recommendation query.
pub fn descriptor_for(emotion: &str) -> String {
    match emotion {
        "sadness" => "música triste melancólica emotiva".to_string(),
        "grief" => "música triste emotiva para procesar dolor".to_string(),
        "joy" => "música alegre feliz positiva".to_string(),
        "excitement" => "música emocionante energética".to_string(),
        "anger" => "música intensa agresiva".to_string(),
        "love" => "música romántica amorosa".to_string(),
        "fear" => "música tranquila calmante".to_string(),
        "chill" => "música relajante tranquila".to_string(),
        "neutral" => "música".to_string(),
        other => format!("música {other}"),
    }
}
