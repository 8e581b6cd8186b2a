mod command_handoff;
mod end_to_end;
mod simulated_excitation;
