use chrono::{DateTime, Utc};

pub fn human_time(t: Option<DateTime<Utc>>) -> String {
    human_time_since(t, Utc::now())
}

fn human_time_since(t: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let t = match t {
        Some(t) => t,
        None => return "never".to_string(),
    };

    let d = now - t;
    let secs = d.num_seconds();

    if secs < 5 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{} seconds ago", secs)
    } else if secs < 3600 {
        let m = d.num_minutes();
        if m == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{} minutes ago", m)
        }
    } else {
        t.format("%H:%M:%S").to_string()
    }
}
