//! `GeoJSON` export of graphs and audited routes, in geographic coordinates

use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use roadnet_core::prelude::*;
use serde_json::json;

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

fn line_geometry(projector: &Projector, line: &LineString<f64>) -> Geometry {
    Geometry::new(GeoJsonValue::from(&projector.unproject_line(line)))
}

/// Every directed edge as a `LineString` feature with its attributes
pub fn edges_to_geojson(graph: &RoadGraph) -> Result<FeatureCollection, Error> {
    let projector = graph.projector();
    let features = graph
        .directed_edges()
        .map(|edge| {
            let attributes = &edge.attributes;
            let value = json!({
                "type": "Feature",
                "geometry": line_geometry(projector, &edge.geometry),
                "properties": {
                    "segment_id": edge.segment_id,
                    "origin": edge.origin,
                    "destination": edge.destination,
                    "road_class": attributes.road_class.to_string(),
                    "pavement_surface": attributes.pavement_surface.to_string(),
                    "pavement_status": attributes.pavement_status.to_string(),
                    "traffic_direction": attributes.traffic_direction.to_string(),
                    "speed_kmh": edge.speed_kmh,
                    "length_m": edge.length_m,
                    // JSON has no infinity
                    "travel_time_min": edge.is_passable().then_some(edge.travel_time_min),
                }
            });
            serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(collection(features))
}

/// Every node as a `Point` feature
pub fn nodes_to_geojson(graph: &RoadGraph) -> Result<FeatureCollection, Error> {
    let projector = graph.projector();
    let features = graph
        .nodes()
        .map(|node| {
            let location: Point<f64> = projector.unproject_point(node.geometry);
            let value = json!({
                "type": "Feature",
                "geometry": Geometry::new(GeoJsonValue::from(&location)),
                "properties": {
                    "node_id": node.id,
                    "merged_from": node.merged_from,
                }
            });
            serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(collection(features))
}

/// Traversed edges of every found route, one feature per edge
pub fn routes_to_geojson(
    graph: &RoadGraph,
    results: &[RouteResult],
) -> Result<FeatureCollection, Error> {
    let projector = graph.projector();
    let mut features = Vec::new();

    for result in results.iter().filter(|r| r.is_found()) {
        for (step, edge) in result.edges.iter().enumerate() {
            let value = json!({
                "type": "Feature",
                "geometry": line_geometry(projector, &edge.geometry),
                "properties": {
                    "query_id": result.query_id,
                    "query_index": result.query_index,
                    "step": step,
                    "segment_id": edge.segment_id,
                    "road_class": edge.road_class.to_string(),
                    "pavement_surface": edge.pavement_surface.to_string(),
                    "speed_kmh": edge.speed_kmh,
                    "length_m": edge.length_m,
                    "travel_time_min": edge.travel_time_min,
                }
            });
            features.push(
                serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))?,
            );
        }
    }

    Ok(collection(features))
}

pub fn edges_to_geojson_string(graph: &RoadGraph) -> Result<String, Error> {
    serde_json::to_string(&edges_to_geojson(graph)?).map_err(|e| Error::GeoJsonError(e.to_string()))
}

pub fn routes_to_geojson_string(graph: &RoadGraph, results: &[RouteResult]) -> Result<String, Error> {
    serde_json::to_string(&routes_to_geojson(graph, results)?)
        .map_err(|e| Error::GeoJsonError(e.to_string()))
}
