//! Imagery Cost Estimator
//!
//! Estimates the credit cost of an aerial imagery request from the command
//! line, or serves the same estimation over HTTP.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_imagery_pricing::{
    AreaOfInterest, EstimateInput, EstimationResponse, EstimationService, ResourceId, ResourceInfo,
};
use eyre::{Result, WrapErr, bail};
use geojson::GeoJson;
use std::path::PathBuf;
use tracing::info;

mod config;
mod output;
mod server;

use config::Config;

#[derive(Parser)]
#[command(name = "cost-estimator", version)]
#[command(about = "Estimate the credit cost of aerial imagery requests")]
struct Cli {
    /// Pricing catalog JSON. Defaults to PRICING_CATALOG_PATH, then the builtin cost table.
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the cost of one request
    Estimate(EstimateArgs),

    /// Show credits per 1000 m² of every priced resource
    CostTable {
        #[arg(long)]
        json: bool,
    },

    /// List every resource identifier
    Resources {
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Overrides HOST
        #[arg(long)]
        host: Option<String>,

        /// Overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct EstimateArgs {
    /// GeoJSON file with the area of interest (Geometry, Feature or FeatureCollection)
    #[arg(long, value_name = "FILE", conflicts_with = "bbox")]
    geojson: Option<PathBuf>,

    /// Rectangle drawn on the map
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        value_name = "MINLON,MINLAT,MAXLON,MAXLAT"
    )]
    bbox: Option<Vec<f64>>,

    /// Resource identifiers, e.g. raster:Vert,aiPacks:pool
    #[arg(short, long, value_delimiter = ',')]
    resources: Vec<String>,

    /// single or all
    #[arg(short, long, default_value = "single")]
    capture_mode: String,

    /// First capture date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Last capture date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Print the estimate as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_catalog_path(cli.catalog);
    init_tracing(&config.environment, config.log_format);

    match cli.command {
        Commands::Estimate(args) => {
            let service = EstimationService::new(config.load_catalog()?);
            let json = args.json;
            let input = estimate_input(args)?;

            let estimation = EstimationResponse::from(service.estimate_input(input)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&estimation)?);
            } else {
                print!("{}", output::estimate_table(&estimation));
            }
        }

        Commands::CostTable { json } => {
            let rows = config.load_catalog()?.cost_table();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", output::cost_table(&rows));
            }
        }

        Commands::Resources { json } => {
            let catalog = config.load_catalog()?;
            let resources: Vec<ResourceInfo> = ResourceId::all()
                .map(|resource| ResourceInfo {
                    resource,
                    category: resource.category(),
                    priced: catalog.contains(resource),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&resources)?);
            } else {
                print!("{}", output::resources(&resources));
            }
        }

        Commands::Serve { host, port } => {
            let mut server_config = config.server.clone();
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }

            observability::init_metrics().wrap_err("Failed to install metrics recorder")?;
            let service = EstimationService::new(config.load_catalog()?);

            info!(
                address = %server_config.address(),
                catalog = %config.catalog_source(),
                "Starting imagery cost estimator API"
            );
            server::serve(service, &server_config, config.catalog_path.clone())
                .await
                .wrap_err("Server error")?;
        }
    }

    Ok(())
}

/// Boundary conversion of the `estimate` flags
fn estimate_input(args: EstimateArgs) -> Result<EstimateInput> {
    let geometry = match (args.geojson, args.bbox) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            let geojson = text
                .parse::<GeoJson>()
                .wrap_err_with(|| format!("{} is not valid GeoJSON", path.display()))?;
            Some(geojson)
        }
        (None, Some(bbox)) => Some(bbox_geojson(&bbox)?),
        (None, None) => None,
    };

    Ok(EstimateInput {
        geometry,
        resources: args.resources,
        capture_mode: Some(args.capture_mode),
        since: args.since,
        until: args.until,
    })
}

fn bbox_geojson(bbox: &[f64]) -> Result<GeoJson> {
    let &[min_lon, min_lat, max_lon, max_lat] = bbox else {
        bail!(
            "--bbox expects 4 comma-separated values (minlon,minlat,maxlon,maxlat), got {}",
            bbox.len()
        );
    };
    let area = AreaOfInterest::from_bbox(min_lon, min_lat, max_lon, max_lat)?;
    Ok(GeoJson::Geometry(geojson::Geometry::from(area.geometry())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bbox_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "cost-estimator",
            "estimate",
            "--bbox",
            "-97.75,30.26,-97.74,30.27",
            "--resources",
            "raster:Vert,aiPacks:pool",
            "--capture-mode",
            "all",
        ])
        .unwrap();

        let Commands::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.bbox, Some(vec![-97.75, 30.26, -97.74, 30.27]));
        assert_eq!(args.resources, vec!["raster:Vert", "aiPacks:pool"]);

        let input = estimate_input(args).unwrap();
        assert!(matches!(input.geometry, Some(GeoJson::Geometry(_))));
        assert_eq!(input.capture_mode.as_deref(), Some("all"));
    }

    #[test]
    fn test_bbox_needs_four_values() {
        assert!(bbox_geojson(&[1.0, 2.0, 3.0]).is_err());
        assert!(bbox_geojson(&[3.0, 2.0, 1.0, 4.0]).is_err());
        assert!(bbox_geojson(&[1.0, 2.0, 3.0, 4.0]).is_ok());
    }

    #[test]
    fn test_bbox_matches_domain_rectangle() {
        let geojson = bbox_geojson(&[-100.0, 10.0, 100.0, 20.0]).unwrap();
        let direct = AreaOfInterest::from_bbox(-100.0, 10.0, 100.0, 20.0).unwrap();
        assert_eq!(AreaOfInterest::from_geojson(&geojson).unwrap(), direct);
    }

    #[test]
    fn test_geojson_and_bbox_conflict() {
        let result = Cli::try_parse_from([
            "cost-estimator",
            "estimate",
            "--geojson",
            "aoi.geojson",
            "--bbox",
            "0,0,1,1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_estimate_without_area_reaches_the_engine() {
        let cli = Cli::try_parse_from(["cost-estimator", "estimate", "-r", "raster:Vert"]).unwrap();
        let Commands::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        let input = estimate_input(args).unwrap();
        assert!(input.geometry.is_none());
        assert_eq!(input.capture_mode.as_deref(), Some("single"));
    }
}
