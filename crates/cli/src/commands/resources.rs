//! Resource management commands

use anyhow::{Context, Result};
use bigml_lib::resource::ResourceList;
use bigml_lib::{BigML, ListQuery, Resource, ResourceId, ResourceKind};
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use crate::output::{
    color_status, format_created, print_info, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for resource tables
#[derive(Tabled, Serialize)]
struct ResourceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Resource> for ResourceRow {
    fn from(resource: &Resource) -> Self {
        let status = resource.status();
        Self {
            id: resource.id().to_string(),
            name: resource.name().unwrap_or("-").to_string(),
            status: color_status(status.code, &status.message),
            created: format_created(resource.created()),
        }
    }
}

fn parse_id(id: &str) -> Result<ResourceId> {
    ResourceId::parse(id).with_context(|| format!("'{}' is not a resource id", id))
}

/// Show one resource
pub async fn get_resource(api: &BigML, id: &str, format: OutputFormat) -> Result<()> {
    let id = parse_id(id)?;
    let resource = api
        .get(&id)
        .await
        .with_context(|| format!("Failed to fetch {}", id))?;

    match format {
        OutputFormat::Json => print_json(&resource.object),
        OutputFormat::Table => print_table(&[ResourceRow::from(&resource)], format, "resources"),
    }

    Ok(())
}

/// List resources of one kind
pub async fn list_resources(
    api: &BigML,
    kind: ResourceKind,
    query: ListQuery,
    format: OutputFormat,
) -> Result<()> {
    debug!(%kind, offset = query.offset, limit = ?query.limit, "Listing resources");
    let listing: ResourceList = api
        .list(kind, &query)
        .await
        .with_context(|| format!("Failed to list {} resources", kind))?;

    if format == OutputFormat::Json {
        print_json(&listing.objects);
        return Ok(());
    }

    let resources: Vec<Resource> = listing
        .objects
        .iter()
        .filter_map(|object| Resource::from_json(object.clone()).ok())
        .collect();
    let skipped = listing.objects.len() - resources.len();

    let rows: Vec<ResourceRow> = resources.iter().map(ResourceRow::from).collect();
    print_table(&rows, format, &format!("{} resources", kind));
    if skipped > 0 {
        print_warning(&format!("Skipped {} documents without a resource id", skipped));
    }
    print_info(&format!(
        "Showing {} of {} {} resources",
        rows.len(),
        listing.meta.total_count,
        kind
    ));

    Ok(())
}

/// Rename a resource
pub async fn rename_resource(
    api: &BigML,
    id: &str,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let id = parse_id(id)?;
    let resource = api
        .update_name(&id, name)
        .await
        .with_context(|| format!("Failed to rename {}", id))?;

    match format {
        OutputFormat::Json => print_json(&resource.object),
        OutputFormat::Table => print_success(&format!("Renamed {} to '{}'", id, name)),
    }

    Ok(())
}

/// Delete a resource
pub async fn delete_resource(api: &BigML, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    api.delete(&id)
        .await
        .with_context(|| format!("Failed to delete {}", id))?;

    print_success(&format!("Deleted {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_from_resource() {
        colored::control::set_override(false);
        let resource = Resource::from_json(json!({
            "resource": "model/563a1c7a3cd25747430023ce",
            "name": "iris",
            "created": "2015-11-04T15:17:38.592000",
            "status": {"code": 5, "message": "The model has been created"}
        }))
        .unwrap();

        let row = ResourceRow::from(&resource);
        assert_eq!(row.id, "model/563a1c7a3cd25747430023ce");
        assert_eq!(row.name, "iris");
        assert_eq!(row.status, "The model has been created");
        assert_eq!(row.created, "2015-11-04 15:17");
    }

    #[test]
    fn test_unnamed_resource_row() {
        let resource = Resource::from_json(json!({
            "resource": "anomaly/564c5a76636e1c3d52000007"
        }))
        .unwrap();

        let row = ResourceRow::from(&resource);
        assert_eq!(row.name, "-");
        assert_eq!(row.created, "-");
    }

    #[test]
    fn test_bad_id_is_rejected() {
        let err = parse_id("model/xyz").unwrap_err();
        assert!(err.to_string().contains("model/xyz"));
    }
}
