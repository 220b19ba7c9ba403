use anyhow::{bail, Result};

use supportdesk::classify::{Classifier, ClassifierConfig};

pub async fn run(config: &ClassifierConfig, description: &str) -> Result<()> {
    if description.trim().is_empty() {
        bail!("Description may not be blank");
    }

    let classifier = Classifier::new(config);
    let result = classifier.classify(description).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_description_rejected() {
        let result = run(&ClassifierConfig::default(), "   ").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_runs_without_key() {
        assert!(run(&ClassifierConfig::default(), "My invoice is wrong").await.is_ok());
    }
}
