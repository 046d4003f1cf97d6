use std::io::Write;

use csv::Writer;

use crate::environment::TransitionModel;

/// Writes the whole table, one row per outcome, under the header
/// `state,action,probability,next_state,reward,done`.
pub fn export_csv<W: Write>(model: &TransitionModel, writer: W) -> csv::Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(&["state", "action", "probability", "next_state", "reward", "done"])?;
    for (state, movement, outcome) in model.iter() {
        wtr.write_record(&[
            state.to_string(),
            movement.index().to_string(),
            outcome.probability.to_string(),
            outcome.next_state.to_string(),
            outcome.reward.to_string(),
            outcome.done.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Grid;
    use crate::maps::Flavor;

    #[test]
    fn writes_one_row_per_outcome() {
        let grid = Grid::new(&["SW", "LG"]).unwrap();
        let model = Flavor::standard().build(&grid).unwrap();
        let mut buf = Vec::new();
        export_csv(&model, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 4 * 4);
        assert_eq!(lines[0], "state,action,probability,next_state,reward,done");
        assert_eq!(lines[1], "0,0,1,0,0,false");
        assert_eq!(lines[2], "0,1,1,2,-5,true");
        assert_eq!(lines[3], "0,2,1,1,0,false");
        assert_eq!(lines[16], "3,3,1,3,0,true");
    }
}
