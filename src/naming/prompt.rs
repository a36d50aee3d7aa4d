//! Prompt construction for era naming.

use crate::models::Era;

/// Render a day count the way a person would say it.
pub fn format_duration(days: i64) -> String {
    if days < 14 {
        format!("{} day{}", days, if days != 1 { "s" } else { "" })
    } else if days < 60 {
        let weeks = days / 7;
        format!("{} week{}", weeks, if weeks != 1 { "s" } else { "" })
    } else {
        let months = days / 30;
        format!("{} month{}", months, if months != 1 { "s" } else { "" })
    }
}

/// Deterministic prompt asking for a JSON `{title, summary}` object.
pub fn build_era_prompt(era: &Era) -> String {
    let start_month = era.start_date.format("%B %Y").to_string();
    let end_month = era.end_date.format("%B %Y").to_string();
    let date_range = if start_month == end_month {
        start_month
    } else {
        format!("{} - {}", start_month, end_month)
    };

    let duration_days = (era.end_date - era.start_date).num_days() + 1;
    let duration = format_duration(duration_days);

    let hours = era.total_ms_played / 3_600_000;
    let listening_time = format!("{} hour{}", hours, if hours != 1 { "s" } else { "" });

    let artists = era
        .top_artists
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, a)| format!("{}. {} ({} plays)", i + 1, a.name, a.plays))
        .collect::<Vec<_>>()
        .join("\n");

    let tracks = era
        .top_tracks
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, t)| format!("{}. {} by {} ({} plays)", i + 1, t.track, t.artist, t.plays))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are analyzing someone's music listening history. Based on this era's data, create a creative title and summary.\n\
        \n\
        Era: {date_range} ({duration})\n\
        Total listening time: {listening_time}\n\
        \n\
        Top Artists:\n\
        {artists}\n\
        \n\
        Top Tracks:\n\
        {tracks}\n\
        \n\
        Create a JSON response with:\n\
        - \"title\": A creative, evocative 2-5 word title that captures the mood/vibe. Avoid generic titles like \"Musical Journey\", \"Eclectic Mix\", or \"Summer Vibes\".\n\
        - \"summary\": A 2-3 sentence summary describing the musical mood, themes, or story of this era.\n\
        \n\
        Respond ONLY with valid JSON: {{\"title\": \"...\", \"summary\": \"...\"}}"
    )
}
