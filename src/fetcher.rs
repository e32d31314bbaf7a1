use std::fs;

use tracing::{debug, warn};

use crate::domain::SpeciesSlug;
use crate::error::PipelineError;
use crate::fs_util::extract_archive_routed;
use crate::layout::Workspace;
use crate::report::{Skip, Stage};
use crate::site::{SpeciesSite, parse_scenario_groups};

pub fn fetch_species<S: SpeciesSite>(
    workspace: &Workspace,
    site: &S,
    slug: &SpeciesSlug,
) -> Result<Vec<Skip>, PipelineError> {
    workspace.ensure_species_dirs(slug)?;

    let html = site.fetch_index(slug)?;
    let groups = parse_scenario_groups(&html);
    let staging = workspace.staging_dir(slug);
    let mut skips = Vec::new();

    for group in groups {
        if !group.available {
            debug!(
                species = slug.as_str(),
                scenario = %group.name,
                "imagery not available"
            );
            skips.push(Skip::new(
                slug,
                Stage::Extract,
                &group.name,
                "imagery not available".to_string(),
            ));
            continue;
        }
        let Some(href) = group.archive_href else {
            warn!(
                species = slug.as_str(),
                scenario = %group.name,
                "scenario group has no archive link"
            );
            skips.push(Skip::new(
                slug,
                Stage::Extract,
                &group.name,
                "no archive link in scenario group".to_string(),
            ));
            continue;
        };

        let zip_path = staging.join(format!("{}.zip", group.name));
        if let Err(err) = site.download_archive(&href, zip_path.as_std_path()) {
            warn!(
                species = slug.as_str(),
                scenario = %group.name,
                error = %err,
                "archive download failed"
            );
            skips.push(Skip::new(slug, Stage::Extract, &group.name, err.to_string()));
            continue;
        }

        match extract_archive_routed(
            zip_path.as_std_path(),
            slug,
            workspace.grid_root().as_std_path(),
            workspace.grid_dir(slug).as_std_path(),
        ) {
            Ok(count) => {
                debug!(
                    species = slug.as_str(),
                    scenario = %group.name,
                    entries = count,
                    "extracted scenario archive"
                );
            }
            Err(err) => {
                warn!(
                    species = slug.as_str(),
                    scenario = %group.name,
                    error = %err,
                    "skipping corrupt archive"
                );
                skips.push(Skip::new(slug, Stage::Extract, &group.name, err.to_string()));
            }
        }
    }

    if staging.as_std_path().exists() {
        fs::remove_dir_all(staging.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("remove {staging}: {err}")))?;
    }
    Ok(skips)
}
