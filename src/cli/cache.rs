//! Offline cache commands: `refresh`, `evict` and `query`.

use anyhow::{bail, Context, Result};

use portico::api::params::QueryParams;
use portico::cache::{CacheService, TENANT_PARAM};
use portico::config::Config;

/// Options for `portico query`.
#[derive(Debug, Default)]
pub(crate) struct QueryOptions {
    pub tenant: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub filters: Vec<String>,
}

impl QueryOptions {
    /// Express the options as query parameters so the CLI and the HTTP
    /// route share one parser.
    fn to_params(&self) -> Result<QueryParams> {
        let mut pairs = Vec::new();
        for raw in &self.filters {
            let (key, value) = raw
                .split_once('=')
                .with_context(|| format!("Filter '{raw}' is not KEY=VALUE"))?;
            pairs.push((key.trim().to_string(), value.to_string()));
        }
        let controls = [
            ("sort", self.sort.clone()),
            ("search", self.search.clone()),
            ("skip", self.skip.map(|s| s.to_string())),
            ("limit", self.limit.map(|l| l.to_string())),
        ];
        for (key, value) in controls {
            if let Some(value) = value {
                pairs.push((key.to_string(), value));
            }
        }
        Ok(QueryParams::from_pairs(pairs))
    }
}

pub(crate) async fn cmd_refresh(
    config: Config,
    endpoints: Vec<String>,
    tenant: Option<String>,
) -> Result<()> {
    config
        .validate_for_serving()
        .context("Invalid configuration")?;
    let service = CacheService::from_config(&config)?;
    let tenant = service.resolve_tenant(tenant.as_deref()).to_string();
    service.init_tenant(&tenant).await;

    let params = vec![(TENANT_PARAM.to_string(), tenant.clone())];
    let outcomes = service.refresh_many(&endpoints, &params).await;
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.error {
            None => println!("  refreshed {} ({})", outcome.alias, tenant),
            Some(err) => {
                failed += 1;
                println!("  FAILED    {} ({}): {}", outcome.alias, tenant, err);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} endpoint(s) failed to refresh", outcomes.len());
    }
    Ok(())
}

pub(crate) async fn cmd_evict(
    config: Config,
    endpoints: Vec<String>,
    tenant: Option<String>,
) -> Result<()> {
    let service = CacheService::from_config(&config)?;
    let tenant = service.resolve_tenant(tenant.as_deref()).to_string();
    let outcomes = service.evict_many(&tenant, &endpoints).await;
    let mut failed = 0;
    for outcome in &outcomes {
        match (&outcome.error, outcome.existed) {
            (Some(err), _) => {
                failed += 1;
                println!("  FAILED  {}: {}", outcome.alias, err);
            }
            (None, true) => println!("  evicted {}", outcome.alias),
            (None, false) => println!("  absent  {}", outcome.alias),
        }
    }
    if failed > 0 {
        bail!("{failed} of {} endpoint(s) failed to evict", outcomes.len());
    }
    Ok(())
}

pub(crate) async fn cmd_query(config: Config, endpoint: String, options: QueryOptions) -> Result<()> {
    let service = CacheService::from_config(&config)?;
    let query = options.to_params()?.to_query();
    let tenant = service.resolve_tenant(options.tenant.as_deref());
    let data = service.get(tenant, &endpoint, &query).await;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico::query::SortDirection;

    #[test]
    fn test_query_options_to_params() {
        let options = QueryOptions {
            sort: Some("name:desc".into()),
            limit: Some(10),
            filters: vec!["status=A".into(), "age[$gt]=30".into()],
            ..QueryOptions::default()
        };
        let query = options.to_params().unwrap().to_query();
        assert_eq!(query.filter.len(), 2);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.sort.unwrap().direction, SortDirection::Desc);
    }

    #[test]
    fn test_query_options_rejects_bad_filter() {
        let options = QueryOptions {
            filters: vec!["no-equals".into()],
            ..QueryOptions::default()
        };
        assert!(options.to_params().is_err());
    }
}
