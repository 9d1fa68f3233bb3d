//! Force-directed layout simulation
//!
//! Given nodes, links and a quality setting, run a fixed number of
//! simulation steps and return settled positions. The physics follow the
//! usual velocity-Verlet scheme with a decaying `alpha`: centering forces
//! on both axes, pairwise charge, and spring links.

use crate::graph::GraphPayload;
use citedin_common::config::ExplorerConfig;
use citedin_common::model::PaperId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Simulation quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Low,
}

impl Quality {
    /// `Low` once the graph has more than `threshold` nodes
    pub fn for_node_count(nodes: usize, threshold: usize) -> Self {
        if nodes > threshold {
            Quality::Low
        } else {
            Quality::High
        }
    }
}

/// Simulation input: node ids plus links as index pairs
#[derive(Debug, Clone, Default)]
pub struct LayoutInput {
    pub nodes: Vec<PaperId>,
    pub links: Vec<(usize, usize)>,
}

impl From<&GraphPayload> for LayoutInput {
    fn from(payload: &GraphPayload) -> Self {
        Self {
            nodes: payload.nodes.iter().map(|n| n.id.clone()).collect(),
            links: payload.links.iter().map(|l| (l.source, l.target)).collect(),
        }
    }
}

/// Settled position of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: PaperId,
    pub x: f64,
    pub y: f64,
}

/// Simulation output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub positions: Vec<NodePosition>,
    pub ticks: usize,
}

/// Layout simulation contract
pub trait LayoutEngine: Send + Sync {
    /// Run the simulation, calling `progress` with the completed fraction
    /// after every step
    fn simulate(&self, input: &LayoutInput, quality: Quality, progress: &mut dyn FnMut(f64)) -> Layout;
}

/// Force layout parameters
#[derive(Debug, Clone)]
pub struct ForceLayoutConfig {
    pub width: f64,
    pub height: f64,
    pub center_strength: f64,
    pub charge_strength: f64,
    pub alpha_min: f64,
    pub velocity_decay: f64,
    pub seed: Option<u64>,
}

impl Default for ForceLayoutConfig {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 500.0,
            center_strength: 0.1,
            charge_strength: -40.0,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            seed: None,
        }
    }
}

impl From<&ExplorerConfig> for ForceLayoutConfig {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            width: config.canvas_width,
            height: config.canvas_height,
            seed: config.layout_seed,
            ..Self::default()
        }
    }
}

/// Steps for alpha to cool from 1 to `alpha_min`
const COOLING_STEPS: usize = 300;

/// Link parameters per quality: (distance, strength, iterations)
fn link_params(quality: Quality) -> (f64, f64, usize) {
    match quality {
        Quality::High => (50.0, 0.2, 1),
        Quality::Low => (100.0, 0.1, 10),
    }
}

/// Default force-directed engine
#[derive(Debug, Clone, Default)]
pub struct ForceLayout {
    config: ForceLayoutConfig,
}

#[derive(Debug, Clone, Copy, Default)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl ForceLayout {
    pub fn new(config: ForceLayoutConfig) -> Self {
        Self { config }
    }

    /// Per-step alpha decay reaching `alpha_min` after `COOLING_STEPS` steps
    fn alpha_decay(&self) -> f64 {
        1.0 - self.config.alpha_min.powf(1.0 / COOLING_STEPS as f64)
    }

    /// Number of steps simulated: a tenth of the full cooling schedule
    pub fn ticks(&self) -> usize {
        COOLING_STEPS.div_ceil(10)
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl LayoutEngine for ForceLayout {
    fn simulate(&self, input: &LayoutInput, quality: Quality, progress: &mut dyn FnMut(f64)) -> Layout {
        let cfg = &self.config;
        let mut rng = self.rng();

        let (cx, cy) = (cfg.width / 2.0, cfg.height / 2.0);

        let mut bodies: Vec<Body> = (0..input.nodes.len())
            .map(|_| Body {
                x: rng.gen::<f64>() * cfg.width,
                y: rng.gen::<f64>() * cfg.height,
                ..Body::default()
            })
            .collect();
        let mut jiggle = move || (rng.gen::<f64>() - 0.5) * 1e-6;

        let links: Vec<(usize, usize)> = input
            .links
            .iter()
            .copied()
            .filter(|&(s, t)| s < bodies.len() && t < bodies.len() && s != t)
            .collect();

        let mut degree = vec![0usize; bodies.len()];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }

        let (distance, strength, iterations) = link_params(quality);
        let ticks = self.ticks();
        let alpha_decay = self.alpha_decay();
        let mut alpha = 1.0;

        for tick in 0..ticks {
            alpha += (0.0 - alpha) * alpha_decay;

            // Centering on both axes
            for body in bodies.iter_mut() {
                body.vx += (cx - body.x) * cfg.center_strength * alpha;
                body.vy += (cy - body.y) * cfg.center_strength * alpha;
            }

            // Pairwise charge
            for i in 0..bodies.len() {
                for j in 0..bodies.len() {
                    if i == j {
                        continue;
                    }
                    let mut dx = bodies[j].x - bodies[i].x;
                    let mut dy = bodies[j].y - bodies[i].y;
                    if dx == 0.0 {
                        dx = jiggle();
                    }
                    if dy == 0.0 {
                        dy = jiggle();
                    }
                    let mut l2 = dx * dx + dy * dy;
                    if l2 < 1.0 {
                        l2 = l2.sqrt();
                    }
                    let w = cfg.charge_strength * alpha / l2;
                    bodies[i].vx += dx * w;
                    bodies[i].vy += dy * w;
                }
            }

            // Springs
            for _ in 0..iterations {
                for &(s, t) in &links {
                    let mut x = bodies[t].x + bodies[t].vx - bodies[s].x - bodies[s].vx;
                    let mut y = bodies[t].y + bodies[t].vy - bodies[s].y - bodies[s].vy;
                    if x == 0.0 {
                        x = jiggle();
                    }
                    if y == 0.0 {
                        y = jiggle();
                    }
                    let l = (x * x + y * y).sqrt();
                    let k = (l - distance) / l * alpha * strength;
                    let (fx, fy) = (x * k, y * k);
                    let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
                    bodies[t].vx -= fx * bias;
                    bodies[t].vy -= fy * bias;
                    bodies[s].vx += fx * (1.0 - bias);
                    bodies[s].vy += fy * (1.0 - bias);
                }
            }

            for body in bodies.iter_mut() {
                body.vx *= 1.0 - cfg.velocity_decay;
                body.vy *= 1.0 - cfg.velocity_decay;
                body.x += body.vx;
                body.y += body.vy;
            }

            progress((tick + 1) as f64 / ticks as f64);
        }

        Layout {
            positions: input
                .nodes
                .iter()
                .zip(bodies)
                .map(|(id, body)| NodePosition {
                    id: id.clone(),
                    x: body.x,
                    y: body.y,
                })
                .collect(),
            ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> ForceLayout {
        ForceLayout::new(ForceLayoutConfig {
            seed: Some(7),
            ..ForceLayoutConfig::default()
        })
    }

    fn chain(n: usize) -> LayoutInput {
        LayoutInput {
            nodes: (0..n).map(|i| PaperId::from(i.to_string())).collect(),
            links: (1..n).map(|i| (i - 1, i)).collect(),
        }
    }

    #[test]
    fn test_quality_threshold() {
        assert_eq!(Quality::for_node_count(500, 500), Quality::High);
        assert_eq!(Quality::for_node_count(501, 500), Quality::Low);
    }

    #[test]
    fn test_tick_count() {
        assert_eq!(ForceLayout::default().ticks(), 30);
    }

    #[test]
    fn test_progress_reaches_one() {
        let mut seen = Vec::new();
        let layout = seeded().simulate(&chain(4), Quality::High, &mut |f| seen.push(f));

        assert_eq!(seen.len(), 30);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
        assert_eq!(layout.ticks, 30);
        assert_eq!(layout.positions.len(), 4);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let input = chain(6);
        let a = seeded().simulate(&input, Quality::Low, &mut |_| {});
        let b = seeded().simulate(&input, Quality::Low, &mut |_| {});
        assert_eq!(a, b);
        assert!(a.positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_out_of_range_links_ignored() {
        let input = LayoutInput {
            nodes: vec!["a".into()],
            links: vec![(0, 5), (0, 0)],
        };
        let layout = seeded().simulate(&input, Quality::High, &mut |_| {});
        assert_eq!(layout.positions[0].id, PaperId::from("a"));
        assert!(layout.positions[0].x.is_finite());
    }

    #[test]
    fn test_empty_input() {
        let layout = seeded().simulate(&LayoutInput::default(), Quality::High, &mut |_| {});
        assert!(layout.positions.is_empty());
    }
}
