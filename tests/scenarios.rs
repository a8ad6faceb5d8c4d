//! End-to-end scenarios across populations, reactions and configuration.

use std::io::Write;
use std::sync::Arc;

use reaction_diffusion::compute::{
    Boundary, BoundaryReaction, DiscretizedScalarField, Embedding, GridManifold, InteriorReaction,
    Manifold, MolecularPopulation, Molecule, Participants, PopulationId, Populations,
    ReactionComplex, ScalarField, Simulation, Stoichiometry, TinyManifold, UpdateMode,
    identity_matrix,
};
use reaction_diffusion::schema::{ConfigError, Pattern, ScenarioConfig};
use reaction_diffusion::KernelError;

fn uniform(grid: &Arc<GridManifold>, name: &str, value: f64, diffusion: f64) -> MolecularPopulation {
    let field = DiscretizedScalarField::from_fn(Arc::clone(grid), |_| value);
    MolecularPopulation::new(Molecule::new(name, 1.0).unwrap(), field.into(), diffusion).unwrap()
}

fn cell(populations: &Populations, id: PopulationId, index: usize) -> f64 {
    populations
        .get(id)
        .unwrap()
        .concentration()
        .get(index)
        .unwrap()
}

#[test]
fn a_plus_b_to_c_on_a_grid() {
    let grid = Arc::new(GridManifold::new(vec![8, 8], 1.0, Boundary::Periodic).unwrap());
    let mut populations = Populations::new();
    let a = populations.insert(uniform(&grid, "A", 2.0, 0.1));
    let b = populations.insert(uniform(&grid, "B", 3.0, 0.1));
    let c = populations.insert(uniform(&grid, "C", 0.0, 0.1));

    let binding = InteriorReaction::new(
        "A + B -> C",
        &populations,
        Participants::new(vec![a, b], vec![c]),
        Stoichiometry::new(vec![1.0, 1.0], vec![1.0]),
        1.0,
    )
    .unwrap();
    let complex = ReactionComplex::builder().reaction(binding).build();
    let mut simulation = Simulation::new(populations, complex, 0.1).unwrap();

    simulation.step().unwrap();

    // Uniform fields do not diffuse, so every cell follows the well-mixed update
    let pops = simulation.populations();
    for index in [0, 17, 63] {
        assert!((cell(pops, a, index) - 1.4).abs() < 1e-12);
        assert!((cell(pops, b, index) - 2.4).abs() < 1e-12);
        assert!((cell(pops, c, index) - 0.6).abs() < 1e-12);
    }

    // A - B is invariant under A + B -> C
    simulation.run(50).unwrap();
    let stats = simulation.stats();
    let difference = stats.get("B").unwrap().amount - stats.get("A").unwrap().amount;
    assert!((difference - 64.0).abs() < 1e-9);
    assert!(stats.get("A").unwrap().min >= 0.0);
}

#[test]
fn mass_action_acts_cell_by_cell() {
    let grid = Arc::new(GridManifold::new(vec![4, 4], 1.0, Boundary::Reflecting).unwrap());
    let a0: Vec<f64> = (0..16).map(|i| 0.5 + 0.25 * i as f64).collect();
    let b0: Vec<f64> = (0..16).map(|i| 4.0 - 0.2 * i as f64).collect();
    let field = |values: &[f64]| DiscretizedScalarField::from_values(Arc::clone(&grid), values.to_vec()).unwrap();

    let mut populations = Populations::new();
    let a = populations.insert(
        MolecularPopulation::new(Molecule::new("A", 1.0).unwrap(), field(&a0).into(), 0.0).unwrap(),
    );
    let b = populations.insert(
        MolecularPopulation::new(Molecule::new("B", 1.0).unwrap(), field(&b0).into(), 0.0).unwrap(),
    );
    let c = populations.insert(uniform(&grid, "C", 0.0, 0.0));

    let binding = InteriorReaction::new(
        "A + B -> C",
        &populations,
        Participants::new(vec![a, b], vec![c]),
        Stoichiometry::new(vec![1.0, 1.0], vec![1.0]),
        0.5,
    )
    .unwrap();
    let complex = ReactionComplex::builder().reaction(binding).build();
    let mut simulation = Simulation::new(populations, complex, 0.1).unwrap();
    simulation.step().unwrap();

    // Each cell reacts with its own concentrations only
    let pops = simulation.populations();
    for index in 0..16 {
        let change = 0.5 * a0[index] * b0[index] * 0.1;
        assert!((cell(pops, a, index) - (a0[index] - change)).abs() < 1e-12, "A at {}", index);
        assert!((cell(pops, b, index) - (b0[index] - change)).abs() < 1e-12, "B at {}", index);
        assert!((cell(pops, c, index) - change).abs() < 1e-12, "C at {}", index);
    }
}

#[test]
fn simulation_rejects_arena_the_reactions_were_not_built_on() {
    let cytosol = Arc::new(GridManifold::new(vec![8, 8], 1.0, Boundary::Reflecting).unwrap());
    let membrane = Arc::new(GridManifold::new(vec![8], 1.0, Boundary::Reflecting).unwrap());
    let mut populations = Populations::new();
    let ligand = populations.insert(uniform(&cytosol, "A", 1.0, 0.1));
    let receptor = populations.insert(uniform(&membrane, "R", 1.0, 0.0));
    let bound = populations.insert(uniform(&membrane, "AR", 0.0, 0.0));

    let capture = |populations: &Populations| {
        let domain: Arc<dyn Manifold> = membrane.clone();
        let range: Arc<dyn Manifold> = cytosol.clone();
        let embedding = Embedding::new(domain, range, vec![0.0, 0.5], identity_matrix(2)).unwrap();
        let reaction = BoundaryReaction::new(
            "A + R -> AR",
            populations,
            embedding,
            Participants::new(vec![ligand], vec![]),
            Participants::new(vec![receptor], vec![bound]),
            Stoichiometry::new(vec![1.0, 1.0], vec![1.0]),
            1.0,
        )
        .unwrap();
        ReactionComplex::builder().reaction(reaction).build()
    };
    let complex = capture(&populations);

    // Same species on a smaller cytosol
    let small = Arc::new(GridManifold::new(vec![4, 4], 1.0, Boundary::Reflecting).unwrap());
    let mut other = Populations::new();
    other.insert(uniform(&small, "A", 1.0, 0.1));
    other.insert(uniform(&membrane, "R", 1.0, 0.0));
    other.insert(uniform(&membrane, "AR", 0.0, 0.0));

    assert!(matches!(
        Simulation::new(other, complex, 0.1),
        Err(KernelError::IncompatibleField(_))
    ));

    let complex = capture(&populations);
    let mut simulation = Simulation::new(populations, complex, 0.1).unwrap();
    simulation.run(5).unwrap();
}

#[test]
fn embedding_rejects_point_of_wrong_dimension() {
    let domain: Arc<dyn Manifold> = Arc::new(TinyManifold::new(3).unwrap());
    let range: Arc<dyn Manifold> = Arc::new(TinyManifold::new(3).unwrap());
    let embedding = Embedding::new(domain, range, vec![0.0; 3], identity_matrix(3)).unwrap();
    assert_eq!(
        embedding.map(&[1.0, 2.0]),
        Err(KernelError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    );
}

#[test]
fn membrane_binding_conserves_amount_with_diffusion() {
    let cytosol = Arc::new(GridManifold::new(vec![12, 12], 0.5, Boundary::Reflecting).unwrap());
    let membrane = Arc::new(GridManifold::new(vec![12], 0.5, Boundary::Reflecting).unwrap());

    let mut populations = Populations::new();
    let ligand = populations.insert(uniform(&cytosol, "L", 1.0, 0.05));
    let receptor = populations.insert(uniform(&membrane, "R", 0.5, 0.0));
    let bound = populations.insert(uniform(&membrane, "LR", 0.0, 0.01));

    let domain: Arc<dyn Manifold> = membrane;
    let range: Arc<dyn Manifold> = cytosol;
    let embedding = Embedding::new(domain, range, vec![0.0, 0.25], identity_matrix(2)).unwrap();
    let capture = BoundaryReaction::new(
        "L + R -> LR",
        &populations,
        embedding,
        Participants::new(vec![ligand], vec![]),
        Participants::new(vec![receptor], vec![bound]),
        Stoichiometry::new(vec![1.0, 1.0], vec![1.0]),
        2.0,
    )
    .unwrap();
    let complex = ReactionComplex::builder().reaction(capture).build();
    let mut simulation = Simulation::new(populations, complex, 0.05).unwrap();

    let amount = |sim: &Simulation, id| sim.populations().get(id).unwrap().total_amount();
    let ligand_total = amount(&simulation, ligand) + amount(&simulation, bound);
    let receptor_total = amount(&simulation, receptor) + amount(&simulation, bound);

    simulation.run(200).unwrap();

    assert!(amount(&simulation, bound) > 0.0);
    assert!((amount(&simulation, ligand) + amount(&simulation, bound) - ligand_total).abs() < 1e-9);
    assert!(
        (amount(&simulation, receptor) + amount(&simulation, bound) - receptor_total).abs() < 1e-9
    );

    // Ligand is depleted next to the membrane first
    let pops = simulation.populations();
    assert!(cell(pops, ligand, 0) < cell(pops, ligand, 143));
}

#[test]
fn update_modes_differ_for_chained_reactions() {
    let run = |mode| {
        let grid = Arc::new(GridManifold::compartment());
        let mut populations = Populations::new();
        let a = populations.insert(uniform(&grid, "A", 1.0, 0.0));
        let b = populations.insert(uniform(&grid, "B", 0.0, 0.0));
        let c = populations.insert(uniform(&grid, "C", 0.0, 0.0));
        let first = InteriorReaction::new(
            "A -> B",
            &populations,
            Participants::new(vec![a], vec![b]),
            Stoichiometry::new(vec![1.0], vec![1.0]),
            1.0,
        )
        .unwrap();
        let second = InteriorReaction::new(
            "B -> C",
            &populations,
            Participants::new(vec![b], vec![c]),
            Stoichiometry::new(vec![1.0], vec![1.0]),
            1.0,
        )
        .unwrap();
        let complex = ReactionComplex::builder()
            .reaction(first)
            .reaction(second)
            .mode(mode)
            .build();
        let mut simulation = Simulation::new(populations, complex, 0.1).unwrap();
        simulation.step().unwrap();
        cell(simulation.populations(), c, 0)
    };

    assert!((run(UpdateMode::Sequential) - 0.01).abs() < 1e-12);
    assert_eq!(run(UpdateMode::Snapshot), 0.0);
}

#[test]
fn config_file_roundtrip() {
    let mut config = ScenarioConfig::default();
    config.species[2].initial = Pattern::Noise {
        amplitude: 0.1,
        seed: 7,
    };
    config.update_mode = UpdateMode::Snapshot;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string_pretty(&config).unwrap()).unwrap();
    file.flush().unwrap();

    let loaded = ScenarioConfig::from_path(file.path()).unwrap();
    assert_eq!(loaded, config);

    // Same seed, same initial state
    let first = Simulation::from_config(&loaded).unwrap().stats();
    let second = Simulation::from_config(&config).unwrap().stats();
    assert_eq!(first, second);
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ScenarioConfig::from_path(dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn default_scenario_runs() {
    let mut simulation = Simulation::from_config(&ScenarioConfig::default()).unwrap();
    simulation.run(20).unwrap();
    let stats = simulation.stats();
    assert_eq!(stats.steps, 20);
    assert!(stats.get("C").unwrap().amount > 0.0);
    assert!(stats.get("CR").unwrap().amount > 0.0);
    assert!(stats.species.iter().all(|s| s.amount.is_finite()));
}
