use tracing::debug;

use crate::store::Store;

/// Arithmetic mean; an empty set averages to 0.
pub fn mean_score<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut n: usize = 0;
    let mut sum: f64 = 0.0;
    for s in scores {
        n += 1;
        sum += s;
    }
    if n > 0 {
        sum / (n as f64)
    } else {
        0.0
    }
}

/// Recomputes a subject's average from its current rating rows and stores it.
/// Always a full recompute, never an incremental adjustment.
pub fn refresh_subject_summary(
    store: &Store<'_>,
    group_id: &str,
    subject_id: &str,
) -> rusqlite::Result<f64> {
    let scores = store.subject_scores(subject_id)?;
    let avg = mean_score(scores.iter().copied());
    store.upsert_summary(group_id, subject_id, avg)?;
    debug!(subject_id, count = scores.len(), avg, "refreshed subject summary");
    Ok(avg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn mean_of_empty_set_is_zero() {
        let avg = mean_score(Vec::<f64>::new());
        assert_eq!(avg, 0.0);
        assert!(!avg.is_nan());
    }

    #[test]
    fn mean_of_scores() {
        assert!((mean_score([85.5, 90.0]) - 87.75).abs() < 1e-9);
        assert!((mean_score([95.0, 90.0]) - 92.5).abs() < 1e-9);
    }

    #[test]
    fn refresh_writes_zero_for_subject_without_ratings() {
        let conn = db::open_in_memory().expect("db");
        let store = Store::new(&conn);
        let (g, _) = store.ensure_group("G", 1, 1).expect("group");
        let (s, _) = store.ensure_subject(&g.id, "Math").expect("subject");
        assert_eq!(refresh_subject_summary(&store, &g.id, &s.id).expect("refresh"), 0.0);
        assert_eq!(
            store.get_summary(&g.id, &s.id).expect("get").map(|x| x.avg_score),
            Some(0.0)
        );
    }

    #[test]
    fn refresh_follows_rating_changes() {
        let conn = db::open_in_memory().expect("db");
        let store = Store::new(&conn);
        let (g, _) = store.ensure_group("G", 2, 1).expect("group");
        let (s, _) = store.ensure_subject(&g.id, "Math").expect("subject");
        let r1 = store.insert_rating(&s.id, 1, "Ivanov", 85.5).expect("r1");
        store.insert_rating(&s.id, 2, "Petrov", 90.0).expect("r2");
        let avg = refresh_subject_summary(&store, &g.id, &s.id).expect("refresh");
        assert!((avg - 87.75).abs() < 1e-9);

        store.update_rating(&r1, "Ivanov", 95.0).expect("update");
        let avg = refresh_subject_summary(&store, &g.id, &s.id).expect("refresh");
        assert!((avg - 92.5).abs() < 1e-9);
    }
}
