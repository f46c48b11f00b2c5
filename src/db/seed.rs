use crate::db::{NewProblem, ProblemCatalog, StoreError};

const HOT_100_JSON: &str = include_str!("../../data/hot100.json");

/// The bundled Hot 100 list, in the official study order.
pub fn hot100_problems() -> Result<Vec<NewProblem>, serde_json::Error> {
    let mut problems: Vec<NewProblem> = serde_json::from_str(HOT_100_JSON)?;
    for problem in &mut problems {
        if problem.url.is_none() {
            problem.url = Some(leetcode_url(&problem.title));
        }
    }
    Ok(problems)
}

pub fn leetcode_url(title: &str) -> String {
    let slug = title.to_lowercase().replace(' ', "-");
    format!("https://leetcode.cn/problems/{slug}/")
}

/// Seeds the catalog once. Existing problems are left alone, so this is safe
/// to run on every startup.
pub async fn seed_catalog(catalog: &dyn ProblemCatalog) -> Result<usize, StoreError> {
    let problems = hot100_problems()
        .map_err(|err| StoreError::Corrupt(format!("bundled problem list: {err}")))?;

    let inserted = catalog.seed_problems(&problems).await?;
    if inserted == 0 {
        tracing::debug!("problem catalog already seeded");
    } else {
        tracing::info!(inserted, "seeded problem catalog");
    }
    Ok(inserted)
}
