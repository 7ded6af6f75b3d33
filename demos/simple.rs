//! basic example to showcase the main functions of HashRing

extern crate hashring;
use hashring::HashRing;

fn main() -> Result<(), hashring::Error> {
    let ring = HashRing::new(2)?;
    let nodes = ["127.0.0.1", "127.0.0.2", "127.0.0.3"];

    for node in nodes {
        ring.add(node)?;
    }

    // return the node that owns the key 'foo'
    println!("node for key foo: {}", ring.locate("foo")?);

    // return Vec<Ownership> containing the hash ranges each node is responsible for
    println!(
        "hash ranges for cluster [127.0.0.1, 127.0.0.2, 127.0.0.3]:\n{:?}",
        ring.ranges()
    );

    // removing a node hands its ranges to the next positions on the ring
    ring.delete("127.0.0.2")?;
    println!(
        "node for key foo after removing 127.0.0.2: {}",
        ring.locate("foo")?
    );

    for (position, node) in ring {
        println!("{position:>10} {node}");
    }

    Ok(())
}
